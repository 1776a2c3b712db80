//! Default process- and network-backed port implementations.

use crate::ports::{Confirm, GitPort, PackageManagerPort, RegistryPort};
use crate::settings::{DEFAULT_REGISTRY_URL, EngineSettings};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::{Command, Output};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use upgrader_transform::{EngineOptions, SourceTransformEngine};
use upgrader_types::Report;

fn git(root: &Utf8Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(root);
    cmd
}

fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).trim().to_string()
}

/// Git queries via the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct ShellGitPort;

impl GitPort for ShellGitPort {
    fn is_installed(&self) -> anyhow::Result<bool> {
        Ok(Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false))
    }

    fn is_repository(&self, root: &Utf8Path) -> anyhow::Result<bool> {
        let out = git(root)
            .args(["rev-parse", "--is-inside-work-tree"])
            .output()
            .context("run git rev-parse")?;
        Ok(out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true")
    }

    fn is_dirty(&self, root: &Utf8Path) -> anyhow::Result<Option<bool>> {
        let out = git(root)
            .args(["status", "--porcelain"])
            .output()
            .context("run git status")?;
        if !out.status.success() {
            debug!(root = %root, stderr = %stderr_of(&out), "git status failed");
            return Ok(None);
        }
        Ok(Some(!out.stdout.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(default)]
    versions: BTreeMap<String, serde_json::Value>,
}

/// Package metadata over HTTP: `GET <registry>/<package>`.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: String,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scoped names keep their `@` and encode the `/`.
    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, package.replace('/', "%2f"))
    }
}

impl RegistryPort for HttpRegistry {
    fn versions(&self, package: &str) -> anyhow::Result<Vec<Version>> {
        let url = self.package_url(package);
        debug!(url = %url, "fetching package metadata");

        let agent = ureq::Agent::new_with_defaults();
        let response = agent
            .get(&url)
            .call()
            .with_context(|| format!("GET {url}"))?;
        let doc: PackageDocument = response
            .into_body()
            .read_json()
            .with_context(|| format!("parse package metadata from {url}"))?;

        Ok(parse_versions(doc.versions.keys()))
    }
}

/// Parse registry version keys, dropping anything that isn't semver. Ascending.
pub fn parse_versions<'a>(keys: impl IntoIterator<Item = &'a String>) -> Vec<Version> {
    let mut versions: Vec<Version> = keys
        .into_iter()
        .filter_map(|raw| match Version::parse(raw) {
            Ok(v) => Some(v),
            Err(_) => {
                debug!(version = %raw, "ignoring non-semver registry version");
                None
            }
        })
        .collect();
    versions.sort();
    versions
}

/// Registry URL: explicit setting, then the package manager's config, then
/// the public registry.
pub fn resolve_registry_url(
    explicit: Option<&str>,
    package_manager: &dyn PackageManagerPort,
    cwd: &Utf8Path,
) -> String {
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        return url.to_string();
    }
    match package_manager.registry_url(cwd) {
        Ok(Some(url)) => url,
        Ok(None) => DEFAULT_REGISTRY_URL.to_string(),
        Err(err) => {
            debug!(error = %format!("{err:#}"), "package manager registry lookup failed");
            DEFAULT_REGISTRY_URL.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManagerKind {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManagerKind {
    pub fn program(self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Yarn => "yarn",
            PackageManagerKind::Pnpm => "pnpm",
        }
    }

    /// Detect from lockfiles in `cwd`; npm when none is present.
    pub fn detect(cwd: &Utf8Path) -> Self {
        const LOCKFILES: &[(&str, PackageManagerKind)] = &[
            ("pnpm-lock.yaml", PackageManagerKind::Pnpm),
            ("yarn.lock", PackageManagerKind::Yarn),
            ("package-lock.json", PackageManagerKind::Npm),
        ];
        LOCKFILES
            .iter()
            .find(|(file, _)| cwd.join(file).is_file())
            .map(|(_, kind)| *kind)
            .unwrap_or(PackageManagerKind::Npm)
    }
}

/// Package manager driven through its executable.
#[derive(Debug, Clone)]
pub struct ShellPackageManager {
    kind: PackageManagerKind,
}

impl ShellPackageManager {
    pub fn new(kind: PackageManagerKind) -> Self {
        Self { kind }
    }

    pub fn detect(cwd: &Utf8Path) -> Self {
        let kind = PackageManagerKind::detect(cwd);
        debug!(manager = kind.program(), "detected package manager");
        Self::new(kind)
    }

    pub fn kind(&self) -> PackageManagerKind {
        self.kind
    }

    fn command(&self, cwd: &Utf8Path) -> Command {
        let mut cmd = Command::new(self.kind.program());
        cmd.current_dir(cwd);
        cmd
    }
}

impl PackageManagerPort for ShellPackageManager {
    fn name(&self) -> &str {
        self.kind.program()
    }

    fn registry_url(&self, cwd: &Utf8Path) -> anyhow::Result<Option<String>> {
        let out = self
            .command(cwd)
            .args(["config", "get", "registry"])
            .output()
            .with_context(|| format!("run {} config get registry", self.name()))?;
        if !out.status.success() {
            anyhow::bail!("{} config get registry: {}", self.name(), stderr_of(&out));
        }
        let url = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if url.is_empty() || url == "undefined" {
            return Ok(None);
        }
        Ok(Some(url))
    }

    fn install(&self, cwd: &Utf8Path) -> anyhow::Result<()> {
        info!(manager = self.name(), cwd = %cwd, "installing dependencies");
        let out = self
            .command(cwd)
            .arg("install")
            .output()
            .with_context(|| format!("run {} install", self.name()))?;

        for line in String::from_utf8_lossy(&out.stdout).lines() {
            debug!(target: "upgrader::install", "{line}");
        }
        for line in String::from_utf8_lossy(&out.stderr).lines() {
            if out.status.success() {
                debug!(target: "upgrader::install", "{line}");
            } else {
                warn!(target: "upgrader::install", "{line}");
            }
        }

        if !out.status.success() {
            anyhow::bail!("{} install exited with {}", self.name(), out.status);
        }
        Ok(())
    }
}

/// Source-transform engine driven through a jscodeshift-compatible CLI.
///
/// The engine prints a `Results:` trailer that is parsed into a [`Report`].
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
        }
    }

    pub fn command_args(
        &self,
        transform: &Utf8Path,
        paths: &[Utf8PathBuf],
        opts: &EngineOptions,
    ) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("--transform={transform}"));
        if !opts.extensions.is_empty() {
            args.push(format!("--extensions={}", opts.extensions.join(",")));
        }
        if let Some(parser) = &opts.parser {
            args.push(format!("--parser={parser}"));
        }
        if opts.dry {
            args.push("--dry".to_string());
        }
        args.extend(paths.iter().map(|p| p.to_string()));
        args
    }
}

impl SourceTransformEngine for CommandEngine {
    fn apply(
        &self,
        transform: &Utf8Path,
        paths: &[Utf8PathBuf],
        opts: &EngineOptions,
    ) -> anyhow::Result<Report> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_args(transform, paths, opts));
        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }

        debug!(program = %self.program, transform = %transform, files = paths.len(), "invoking engine");
        let out = cmd
            .output()
            .with_context(|| format!("spawn {}", self.program))?;
        let stdout = String::from_utf8_lossy(&out.stdout);

        match parse_engine_summary(&stdout) {
            Some(report) => Ok(report),
            None if !out.status.success() => {
                anyhow::bail!("{} exited with {}: {}", self.program, out.status, stderr_of(&out))
            }
            None => anyhow::bail!("{} printed no results summary", self.program),
        }
    }
}

static SUMMARY_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(ok|unmodified|skipped|errors)\b").expect("summary count pattern compiles")
});

static SUMMARY_ELAPSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Time elapsed:\s*([0-9]+(?:\.[0-9]+)?)").expect("elapsed pattern compiles")
});

/// Parse the engine's `Results:` trailer.
///
/// ```text
/// Results:
/// 0 errors
/// 3 unmodified
/// 1 skipped
/// 2 ok
/// Time elapsed: 0.512seconds
/// ```
pub fn parse_engine_summary(output: &str) -> Option<Report> {
    let start = output.rfind("Results:")?;
    let tail = &output[start..];

    let mut report = Report::default();
    for caps in SUMMARY_COUNT.captures_iter(tail) {
        let n: u64 = caps[1].parse().unwrap_or(0);
        match &caps[2] {
            "ok" => report.ok = n,
            "unmodified" => report.nochange = n,
            "skipped" => report.skip = n,
            _ => report.error = n,
        }
    }

    report.time_elapsed = SUMMARY_ELAPSED
        .captures(tail)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or_default();

    Some(report)
}

/// Answers every confirmation with a fixed value (`--yes`, CI).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, message: &str) -> anyhow::Result<bool> {
        info!(answer = self.0, "{message}");
        Ok(self.0)
    }
}
