//! Select codemods from the repository and run them against a project.

use crate::error::UpgradeError;
use crate::ports::{CodemodSelector, identity_selector};
use crate::settings::{CodemodSelection, CodemodSettings};
use tracing::{debug, info};
use upgrader_domain::{CodemodRepository, FindQuery, Project, Range, ReleaseType, RunOptions, Target};
use upgrader_transform::RunContext;
use upgrader_types::{Codemod, CodemodReport, VersionedCollection};

/// Terminal outcome of a codemod run.
#[derive(Debug)]
pub enum CodemodRunnerReport {
    Success { reports: Vec<CodemodReport> },
    Failure { error: anyhow::Error },
}

impl CodemodRunnerReport {
    pub fn is_success(&self) -> bool {
        matches!(self, CodemodRunnerReport::Success { .. })
    }

    /// Per-codemod reports; empty on failure.
    pub fn reports(&self) -> &[CodemodReport] {
        match self {
            CodemodRunnerReport::Success { reports } => reports,
            CodemodRunnerReport::Failure { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            CodemodRunnerReport::Success { .. } => None,
            CodemodRunnerReport::Failure { error } => Some(error),
        }
    }

    fn from_result(result: anyhow::Result<Vec<CodemodReport>>) -> Self {
        match result {
            Ok(reports) => CodemodRunnerReport::Success { reports },
            Err(error) => CodemodRunnerReport::Failure { error },
        }
    }
}

pub struct CodemodRunner<'a> {
    project: &'a Project,
    repository: &'a CodemodRepository,
    range: Range,
    options: RunOptions,
    selector: CodemodSelector,
}

impl<'a> CodemodRunner<'a> {
    pub fn new(project: &'a Project, repository: &'a CodemodRepository, range: Range) -> Self {
        Self {
            project,
            repository,
            range,
            options: RunOptions::default(),
            selector: identity_selector(),
        }
    }

    pub fn dry(mut self, dry: bool) -> Self {
        self.options.dry = dry;
        self
    }

    pub fn parser(mut self, parser: Option<String>) -> Self {
        self.options.parser = parser;
        self
    }

    /// Replace the selection strategy applied to matched collections.
    pub fn on_select(mut self, selector: CodemodSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    /// Collections the range matches, before selection.
    pub fn matches(&self) -> Vec<VersionedCollection> {
        self.repository
            .find(&FindQuery::in_range(self.range.clone()))
    }

    pub fn run(&self, ctx: &mut RunContext) -> CodemodRunnerReport {
        CodemodRunnerReport::from_result(self.try_run(ctx))
    }

    /// Run a single codemod by uid, ignoring the range.
    pub fn run_by_uid(&self, uid: &str, ctx: &mut RunContext) -> CodemodRunnerReport {
        CodemodRunnerReport::from_result(self.try_run_by_uid(uid, ctx))
    }

    pub(crate) fn try_run(&self, ctx: &mut RunContext) -> anyhow::Result<Vec<CodemodReport>> {
        let matched = self.matches();
        debug!(range = %self.range, collections = matched.len(), "matched codemods");

        let selected = (self.selector)(matched)?;
        let codemods: Vec<Codemod> = flatten_ascending(selected);
        if codemods.is_empty() {
            info!(range = %self.range, "no codemods to run");
            return Ok(Vec::new());
        }

        info!(count = codemods.len(), dry = self.options.dry, "running codemods");
        Ok(self.project.run_codemods(&codemods, &self.options, ctx)?)
    }

    fn try_run_by_uid(&self, uid: &str, ctx: &mut RunContext) -> anyhow::Result<Vec<CodemodReport>> {
        let codemod = self
            .repository
            .find_by_uid(uid)
            .ok_or_else(|| UpgradeError::UnknownCodemod {
                uid: uid.to_string(),
            })?;
        info!(uid, dry = self.options.dry, "running codemod by uid");
        Ok(self.project.run_codemods(&[codemod], &self.options, ctx)?)
    }
}

/// Codemods newer than the installed framework version; every codemod for
/// plugins.
pub fn pending_range(project: &Project) -> Result<Range, upgrader_domain::DomainError> {
    project.codemod_range(&Target::Release(ReleaseType::Latest))
}

/// Run whatever `settings.selection` names against the project.
pub fn run_codemods(
    project: &Project,
    repository: &CodemodRepository,
    settings: &CodemodSettings,
    selector: Option<CodemodSelector>,
    ctx: &mut RunContext,
) -> CodemodRunnerReport {
    let range = match &settings.selection {
        CodemodSelection::Pending => match pending_range(project) {
            Ok(range) => range,
            Err(err) => return CodemodRunnerReport::Failure { error: err.into() },
        },
        CodemodSelection::Range(range) => range.clone(),
        CodemodSelection::Uid(_) => Range::any(),
    };

    let mut runner = CodemodRunner::new(project, repository, range)
        .dry(settings.dry)
        .parser(settings.parser.clone());
    if let Some(selector) = selector {
        runner = runner.on_select(selector);
    }

    match &settings.selection {
        CodemodSelection::Uid(uid) => runner.run_by_uid(uid, ctx),
        _ => runner.run(ctx),
    }
}

/// Codemods from every collection, ascending by version. Order within a
/// collection is preserved.
pub fn flatten_ascending(mut collections: Vec<VersionedCollection>) -> Vec<Codemod> {
    collections.sort_by(|a, b| a.version.cmp(&b.version));
    collections.into_iter().flat_map(|c| c.codemods).collect()
}
