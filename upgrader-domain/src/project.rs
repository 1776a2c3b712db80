//! The project being upgraded: its manifest, kind and candidate files.

use crate::error::{DomainError, DomainResult};
use crate::manifest::{self, FrameworkSpec, MANIFEST_FILE};
use crate::version::{self, Range, Target};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use semver::Version;
use serde_json::Value;
use tracing::{debug, info};
use upgrader_transform::{RunContext, RunnerConfig, TransformResult};
use upgrader_types::{Codemod, CodemodReport};
use walkdir::WalkDir;

const APPLICATION_ROOTS: &[&str] = &[
    "src",
    "config",
    "types",
    "database",
    "package.json",
    "tsconfig.json",
];

const PLUGIN_ROOTS: &[&str] = &["admin", "server", "src", "package.json", "tsconfig.json"];

const EXCLUDED_DIRS: &[&str] = &["node_modules", "dist", "build", ".git", ".cache", "coverage"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKind {
    Application { framework_version: Version },
    Plugin,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Application { .. } => "application",
            ProjectKind::Plugin => "plugin",
        }
    }
}

/// Which paths under the project root are scanned.
///
/// `roots` are files or directories relative to the project root; `exclude`
/// globs are matched against paths relative to the project root.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    pub roots: Vec<String>,
    pub exclude: Vec<String>,
}

impl ScanPolicy {
    pub fn for_application() -> Self {
        Self::with_roots(APPLICATION_ROOTS)
    }

    pub fn for_plugin() -> Self {
        Self::with_roots(PLUGIN_ROOTS)
    }

    fn with_roots(roots: &[&str]) -> Self {
        let exclude = EXCLUDED_DIRS
            .iter()
            .flat_map(|dir| [format!("**/{dir}"), format!("**/{dir}/**")])
            .collect();
        Self {
            roots: roots.iter().map(|r| r.to_string()).collect(),
            exclude,
        }
    }

    fn exclude_set(&self) -> Result<GlobSet, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            builder.add(Glob::new(pattern)?);
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry: bool,
    pub parser: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Project {
    cwd: Utf8PathBuf,
    framework: FrameworkSpec,
    manifest_path: Utf8PathBuf,
    manifest: Value,
    kind: ProjectKind,
    files: Vec<Utf8PathBuf>,
}

impl Project {
    /// Read the manifest at `cwd`, classify the project and scan its files.
    pub fn load(cwd: impl Into<Utf8PathBuf>, framework: &FrameworkSpec) -> DomainResult<Self> {
        let cwd = cwd.into();
        let manifest_path = cwd.join(MANIFEST_FILE);
        let manifest = manifest::read_manifest(&manifest_path)?;
        let kind = classify(&cwd, &manifest, framework)?;

        let mut project = Self {
            cwd,
            framework: framework.clone(),
            manifest_path,
            manifest,
            kind,
            files: Vec::new(),
        };
        project.files = project.scan()?;
        info!(
            cwd = %project.cwd,
            kind = project.kind.as_str(),
            files = project.files.len(),
            "project loaded"
        );
        Ok(project)
    }

    /// Re-read the manifest and rescan files. The project kind is fixed at load.
    pub fn refresh(&mut self) -> DomainResult<()> {
        self.manifest = manifest::read_manifest(&self.manifest_path)?;
        self.files = self.scan()?;
        debug!(files = self.files.len(), "project refreshed");
        Ok(())
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    pub fn framework(&self) -> &FrameworkSpec {
        &self.framework
    }

    pub fn manifest(&self) -> &Value {
        &self.manifest
    }

    pub fn manifest_path(&self) -> &Utf8Path {
        &self.manifest_path
    }

    pub fn kind(&self) -> &ProjectKind {
        &self.kind
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self.kind, ProjectKind::Plugin)
    }

    /// Installed framework version; `None` for plugins.
    pub fn framework_version(&self) -> Option<&Version> {
        match &self.kind {
            ProjectKind::Application { framework_version } => Some(framework_version),
            ProjectKind::Plugin => None,
        }
    }

    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    pub fn files_by_extensions(&self, extensions: &[&str]) -> Vec<Utf8PathBuf> {
        self.files
            .iter()
            .filter(|f| f.extension().is_some_and(|ext| extensions.contains(&ext)))
            .cloned()
            .collect()
    }

    /// Codemod range for moving to `target`.
    ///
    /// Applications start from their installed version. Plugins have none,
    /// so a release type matches every version and an exact target caps it.
    pub fn codemod_range(&self, target: &Target) -> DomainResult<Range> {
        match (&self.kind, target) {
            (ProjectKind::Application { framework_version }, _) => {
                version::range_from_target(framework_version, target)
            }
            (ProjectKind::Plugin, Target::Exact(v)) => Ok(Range {
                lower: None,
                upper: Some(version::Bound::inclusive(v.clone())),
            }),
            (ProjectKind::Plugin, Target::Release(_)) => Ok(Range::any()),
        }
    }

    /// Run codemods in order, each on the files its runner consumes.
    pub fn run_codemods(
        &self,
        codemods: &[Codemod],
        opts: &RunOptions,
        ctx: &mut RunContext,
    ) -> TransformResult<Vec<CodemodReport>> {
        let config = RunnerConfig {
            dry: opts.dry,
            cwd: Some(self.cwd.clone()),
            parser: opts.parser.clone(),
        };

        let mut reports = Vec::with_capacity(codemods.len());
        for codemod in codemods {
            let paths = self.files_by_extensions(ctx.extensions_for(codemod)?);
            let report = ctx.run_codemod(codemod, &paths, &config)?;
            info!(
                uid = %codemod.uid(),
                ok = report.ok,
                nochange = report.nochange,
                skip = report.skip,
                error = report.error,
                "codemod finished"
            );
            reports.push(CodemodReport {
                codemod: codemod.clone(),
                report,
            });
        }
        Ok(reports)
    }

    fn scan(&self) -> DomainResult<Vec<Utf8PathBuf>> {
        let policy = match self.kind {
            ProjectKind::Application { .. } => ScanPolicy::for_application(),
            ProjectKind::Plugin => ScanPolicy::for_plugin(),
        };
        scan_files(&self.cwd, &policy)
    }
}

/// Collect files under `policy.roots`, pruning excluded directories.
/// Results are absolute and sorted.
pub fn scan_files(cwd: &Utf8Path, policy: &ScanPolicy) -> DomainResult<Vec<Utf8PathBuf>> {
    let scan_err = |message: String| DomainError::ProjectScan {
        root: cwd.to_path_buf(),
        message,
    };
    let exclude = policy.exclude_set().map_err(|e| scan_err(e.to_string()))?;

    let mut files = Vec::new();
    for root in &policy.roots {
        let start = cwd.join(root);
        if !start.exists() {
            continue;
        }

        let walker = WalkDir::new(&start).follow_links(false).into_iter().filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(cwd)
                .map(|rel| !exclude.is_match(rel))
                .unwrap_or(true)
        });

        for entry in walker {
            let entry = entry.map_err(|e| scan_err(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => files.push(path),
                Err(path) => debug!(path = %path.display(), "skipping non-UTF-8 path"),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn classify(cwd: &Utf8Path, manifest: &Value, framework: &FrameworkSpec) -> DomainResult<ProjectKind> {
    let is_plugin = manifest
        .get(framework.manifest_key())
        .and_then(|meta| meta.get("kind"))
        .and_then(Value::as_str)
        == Some("plugin");

    if is_plugin {
        return Ok(ProjectKind::Plugin);
    }

    let framework_version = resolve_framework_version(cwd, manifest, framework)?;
    Ok(ProjectKind::Application { framework_version })
}

/// Resolve the installed framework version: a literal version declared in
/// the manifest first, then the installed package's own manifest.
pub fn resolve_framework_version(
    cwd: &Utf8Path,
    manifest: &Value,
    framework: &FrameworkSpec,
) -> DomainResult<Version> {
    if let Some(declared) = manifest::declared_framework_version(manifest, framework) {
        debug!(version = %declared, "framework version from manifest");
        return Ok(declared);
    }

    let Some(installed) = installed_manifest(cwd, &framework.package) else {
        return Err(DomainError::MissingDependency {
            package: framework.package.clone(),
            cwd: cwd.to_path_buf(),
        });
    };
    let value = manifest::read_manifest(&installed)?;
    let raw = value.get("version").and_then(Value::as_str).ok_or_else(|| {
        DomainError::MissingDependency {
            package: framework.package.clone(),
            cwd: cwd.to_path_buf(),
        }
    })?;
    debug!(path = %installed, version = raw, "framework version from installed package");
    version::parse(raw)
}

/// `node_modules/<package>/package.json`, searching `cwd` and its ancestors.
pub fn installed_manifest(cwd: &Utf8Path, package: &str) -> Option<Utf8PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join("node_modules").join(package).join(MANIFEST_FILE))
        .find(|candidate| candidate.is_file())
}
