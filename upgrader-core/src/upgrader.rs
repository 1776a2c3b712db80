//! The upgrade pipeline.
//!
//! Stages run in order and the first error aborts the rest:
//! resolve target, check requirements, run codemods, refresh the project,
//! rewrite the manifest, reinstall dependencies. In dry mode codemods report
//! without writing and the last two stages are skipped.

use crate::codemod_runner::CodemodRunner;
use crate::error::UpgradeError;
use crate::ports::{CodemodSelector, Confirm, GitPort, PackageManagerPort, RegistryPort};
use crate::requirements::{UpgradeContext, UpgradeRequirement, git_requirements, major_upgrade_requirements};
use crate::settings::UpgradeSettings;
use semver::Version;
use std::sync::Arc;
use tracing::{debug, info};
use upgrader_domain::manifest;
use upgrader_domain::version::{self, ReleaseType};
use upgrader_domain::{CodemodRepository, DomainError, Project, Range, RequirementChain, Target};
use upgrader_transform::RunContext;
use upgrader_types::CodemodReport;

/// Everything the upgrade talks to.
#[derive(Clone)]
pub struct UpgradePorts {
    pub registry: Arc<dyn RegistryPort>,
    pub package_manager: Arc<dyn PackageManagerPort>,
    pub git: Arc<dyn GitPort>,
    pub confirm: Arc<dyn Confirm>,
}

/// Terminal outcome of an upgrade.
#[derive(Debug)]
pub enum UpgradeReport {
    Success {
        /// `None` for plugins.
        from: Option<Version>,
        to: Version,
        reports: Vec<CodemodReport>,
        /// Dependencies rewritten in the manifest; empty in dry mode.
        bumped: Vec<String>,
    },
    Failure {
        error: anyhow::Error,
    },
}

impl UpgradeReport {
    pub fn is_success(&self) -> bool {
        matches!(self, UpgradeReport::Success { .. })
    }

    pub fn reports(&self) -> &[CodemodReport] {
        match self {
            UpgradeReport::Success { reports, .. } => reports,
            UpgradeReport::Failure { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            UpgradeReport::Success { .. } => None,
            UpgradeReport::Failure { error } => Some(error),
        }
    }
}

struct Outcome {
    to: Version,
    reports: Vec<CodemodReport>,
    bumped: Vec<String>,
}

pub struct Upgrader {
    project: Project,
    repository: CodemodRepository,
    ports: UpgradePorts,
    settings: UpgradeSettings,
    requirements: Vec<UpgradeRequirement>,
    selector: Option<CodemodSelector>,
}

impl Upgrader {
    pub fn new(
        project: Project,
        repository: CodemodRepository,
        ports: UpgradePorts,
        settings: UpgradeSettings,
    ) -> Self {
        Self {
            project,
            repository,
            ports,
            settings,
            requirements: Vec::new(),
            selector: None,
        }
    }

    /// Add a requirement tested after the builtin ones.
    pub fn with_requirement(mut self, requirement: UpgradeRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn on_select(mut self, selector: CodemodSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn upgrade(&mut self, ctx: &mut RunContext) -> UpgradeReport {
        let span = tracing::info_span!(
            parent: ctx.span(),
            "upgrade",
            target = %self.settings.target,
            dry = self.settings.dry
        );
        let _enter = span.enter();

        let from = self.project.framework_version().cloned();
        match self.try_upgrade(ctx) {
            Ok(outcome) => {
                info!(to = %outcome.to, codemods = outcome.reports.len(), "upgrade complete");
                UpgradeReport::Success {
                    from,
                    to: outcome.to,
                    reports: outcome.reports,
                    bumped: outcome.bumped,
                }
            }
            Err(error) => UpgradeReport::Failure { error },
        }
    }

    fn try_upgrade(&mut self, ctx: &mut RunContext) -> anyhow::Result<Outcome> {
        let package = self.project.framework().package.clone();
        let current = self.project.framework_version().cloned();

        if let Target::Exact(target) = &self.settings.target
            && current.as_ref() == Some(target)
        {
            return Err(UpgradeError::AlreadyUpToDate {
                package,
                version: target.to_string(),
            }
            .into());
        }

        let available = self
            .ports
            .registry
            .versions(&package)
            .map_err(|source| UpgradeError::Registry {
                package: package.clone(),
                source,
            })?;
        debug!(count = available.len(), "fetched published versions");

        let target = self.resolve_target(&package, current.as_ref(), &available)?;
        info!(package = %package, from = ?current.as_ref().map(Version::to_string), to = %target, "upgrade target resolved");

        self.check_requirements(current.clone(), target.clone(), available)?;

        let reports = self.run_codemods(current.as_ref(), &target, ctx)?;

        self.project.refresh()?;

        let bumped = if self.settings.dry {
            debug!("dry run; manifest left untouched");
            Vec::new()
        } else {
            self.rewrite_manifest(current.as_ref(), &target)?
        };

        if self.settings.dry {
            debug!("dry run; skipping install");
        } else {
            let pm = &self.ports.package_manager;
            pm.install(self.project.cwd())
                .map_err(|source| UpgradeError::Install {
                    manager: pm.name().to_string(),
                    source,
                })?;
        }

        Ok(Outcome {
            to: target,
            reports,
            bumped,
        })
    }

    fn resolve_target(
        &self,
        package: &str,
        current: Option<&Version>,
        available: &[Version],
    ) -> anyhow::Result<Version> {
        match &self.settings.target {
            Target::Exact(target) => {
                if let Some(current) = current {
                    version::range_from_target(current, &self.settings.target)?;
                }
                if !available.contains(target) {
                    return Err(UpgradeError::NoCandidate {
                        package: package.to_string(),
                        range: Range::exact(target.clone()).to_string(),
                    }
                    .into());
                }
                Ok(target.clone())
            }
            Target::Release(_) => {
                let range = self.project.codemod_range(&self.settings.target)?;
                // Prereleases are only reachable through an exact target.
                available
                    .iter()
                    .filter(|v| v.pre.is_empty() && range.contains(v))
                    .max()
                    .cloned()
                    .ok_or_else(|| {
                        UpgradeError::NoCandidate {
                            package: package.to_string(),
                            range: range.to_string(),
                        }
                        .into()
                    })
            }
        }
    }

    fn check_requirements(
        &self,
        current: Option<Version>,
        target: Version,
        available: Vec<Version>,
    ) -> Result<(), DomainError> {
        let mut chain: RequirementChain<UpgradeContext> = RequirementChain::new();
        if self.settings.target == Target::Release(ReleaseType::Major) && current.is_some() {
            chain.extend(major_upgrade_requirements());
        }
        if self.settings.git_checks {
            chain.push(git_requirements());
        }

        let context = UpgradeContext {
            cwd: self.project.cwd().to_path_buf(),
            current,
            target,
            available,
            git: Arc::clone(&self.ports.git),
        };

        chain.test(&context, self.ports.confirm.as_ref())?;
        for requirement in &self.requirements {
            requirement.test(&context, self.ports.confirm.as_ref())?;
        }
        Ok(())
    }

    fn run_codemods(
        &self,
        current: Option<&Version>,
        target: &Version,
        ctx: &mut RunContext,
    ) -> anyhow::Result<Vec<CodemodReport>> {
        let codemods_target = self
            .settings
            .codemods_target
            .clone()
            .unwrap_or_else(|| target.clone());
        let exact = Target::Exact(codemods_target);
        let range = match current {
            Some(current) => version::range_from_target(current, &exact)?,
            None => self.project.codemod_range(&exact)?,
        };

        let mut runner = CodemodRunner::new(&self.project, &self.repository, range)
            .dry(self.settings.dry)
            .parser(self.settings.parser.clone());
        if let Some(selector) = &self.selector {
            runner = runner.on_select(Arc::clone(selector));
        }
        runner.try_run(ctx)
    }

    fn rewrite_manifest(
        &self,
        current: Option<&Version>,
        target: &Version,
    ) -> anyhow::Result<Vec<String>> {
        let Some(current) = current else {
            debug!("plugin project; no pinned framework version to bump");
            return Ok(Vec::new());
        };

        let path = self.project.manifest_path().to_path_buf();
        let mut value = self.project.manifest().clone();
        let bumped =
            manifest::bump_scoped_dependencies(&mut value, self.project.framework(), current, target);
        if bumped.is_empty() {
            debug!("no scoped dependency pinned to the installed version");
            return Ok(bumped);
        }

        manifest::write_manifest(&path, &value)
            .map_err(|source| UpgradeError::Manifest {
                path: path.clone(),
                source,
            })?;
        info!(path = %path, dependencies = ?bumped, "manifest updated");
        Ok(bumped)
    }
}
