//! Transform runners.
//!
//! Each runner handles exactly one [`CodemodKind`]. The [`RunnerTable`]
//! dispatches a codemod to its runner after the kind check.

use crate::context::RunServices;
use crate::document::{DocumentApi, DocumentFile};
use crate::engine::EngineOptions;
use crate::error::{TransformError, TransformResult};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;
use upgrader_types::{Codemod, CodemodKind, Report};

/// Source file extensions handed to the code engine.
pub const CODE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Document file extensions.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["json"];

#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub dry: bool,
    pub cwd: Option<Utf8PathBuf>,
    /// Parser hint forwarded to the code engine (`ts`, `tsx`, `babel`, ...).
    pub parser: Option<String>,
}

pub trait TransformRunner {
    fn kind(&self) -> CodemodKind;

    fn extensions(&self) -> &'static [&'static str];

    fn valid(&self, codemod: &Codemod) -> bool {
        codemod.kind == self.kind()
    }

    fn run(
        &self,
        codemod: &Codemod,
        paths: &[Utf8PathBuf],
        config: &RunnerConfig,
        services: &mut RunServices,
    ) -> TransformResult<Report>;
}

fn ensure_valid(runner: &dyn TransformRunner, codemod: &Codemod) -> TransformResult<()> {
    if runner.valid(codemod) {
        Ok(())
    } else {
        Err(TransformError::InvalidCodemod {
            uid: codemod.uid(),
            kind: codemod.kind,
            runner: runner.kind(),
        })
    }
}

/// Runs code codemods through the configured source-transform engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeRunner;

impl TransformRunner for CodeRunner {
    fn kind(&self) -> CodemodKind {
        CodemodKind::Code
    }

    fn extensions(&self) -> &'static [&'static str] {
        CODE_EXTENSIONS
    }

    fn run(
        &self,
        codemod: &Codemod,
        paths: &[Utf8PathBuf],
        config: &RunnerConfig,
        services: &mut RunServices,
    ) -> TransformResult<Report> {
        ensure_valid(self, codemod)?;
        if paths.is_empty() {
            debug!(uid = %codemod.uid(), "no source files; skipping engine");
            return Ok(Report::default());
        }

        let opts = EngineOptions {
            dry: config.dry,
            extensions: CODE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            parser: config.parser.clone(),
            cwd: config.cwd.clone(),
        };

        services
            .engine()
            .apply(&codemod.path(), paths, &opts)
            .map_err(|source| TransformError::Engine {
                uid: codemod.uid(),
                source,
            })
    }
}

enum FileOutcome {
    Changed,
    Unchanged,
}

/// Runs document codemods in-process, one file at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRunner;

impl DocumentRunner {
    fn run_file(
        transform: &dyn crate::document::DocumentTransform,
        path: &Utf8Path,
        dry: bool,
    ) -> anyhow::Result<FileOutcome> {
        let contents = fs::read_to_string(path)?;
        let json: Value =
            serde_json::from_str(&contents).with_context(|| format!("parse {path}"))?;

        let mut api = DocumentApi::new(&json);
        let file = DocumentFile {
            path: path.to_path_buf(),
            json,
        };

        let Some(output) = transform.transform(&file, &mut api)? else {
            anyhow::bail!("transform returned no document for {path}");
        };

        if output == file.json {
            return Ok(FileOutcome::Unchanged);
        }

        if !dry {
            let mut out = serde_json::to_string_pretty(&output)?;
            out.push('\n');
            fs::write(path, out)?;
        }
        Ok(FileOutcome::Changed)
    }
}

impl TransformRunner for DocumentRunner {
    fn kind(&self) -> CodemodKind {
        CodemodKind::Document
    }

    fn extensions(&self) -> &'static [&'static str] {
        DOCUMENT_EXTENSIONS
    }

    fn run(
        &self,
        codemod: &Codemod,
        paths: &[Utf8PathBuf],
        config: &RunnerConfig,
        services: &mut RunServices,
    ) -> TransformResult<Report> {
        ensure_valid(self, codemod)?;
        let started = Instant::now();
        let mut report = Report::default();

        let transform = match services.document_transform(codemod) {
            Ok(t) => t,
            Err(err) => {
                debug!(uid = %codemod.uid(), error = %err, "document codemod failed to load");
                report.error = paths.len() as u64;
                report.time_elapsed = started.elapsed();
                return Ok(report);
            }
        };

        for path in paths {
            match Self::run_file(transform.as_ref(), path, config.dry) {
                Ok(FileOutcome::Changed) => report.ok += 1,
                Ok(FileOutcome::Unchanged) => report.nochange += 1,
                Err(err) => {
                    debug!(uid = %codemod.uid(), path = %path, error = %format!("{err:#}"), "document transform failed");
                    report.error += 1;
                }
            }
        }

        report.time_elapsed = started.elapsed();
        Ok(report)
    }
}

/// Runner lookup keyed by codemod kind.
pub struct RunnerTable {
    runners: BTreeMap<CodemodKind, Box<dyn TransformRunner>>,
}

impl Default for RunnerTable {
    fn default() -> Self {
        Self::empty()
            .with_runner(Box::new(CodeRunner))
            .with_runner(Box::new(DocumentRunner))
    }
}

impl RunnerTable {
    pub fn empty() -> Self {
        Self {
            runners: BTreeMap::new(),
        }
    }

    /// Register a runner under its own kind, replacing any previous one.
    pub fn with_runner(mut self, runner: Box<dyn TransformRunner>) -> Self {
        self.runners.insert(runner.kind(), runner);
        self
    }

    pub fn get(&self, kind: CodemodKind) -> Option<&dyn TransformRunner> {
        self.runners.get(&kind).map(|r| r.as_ref())
    }

    pub fn runner_for(&self, codemod: &Codemod) -> TransformResult<&dyn TransformRunner> {
        self.get(codemod.kind).ok_or_else(|| TransformError::NoRunner {
            uid: codemod.uid(),
            kind: codemod.kind,
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = CodemodKind> + '_ {
        self.runners.keys().copied()
    }
}
