//! Port for the external source-transform engine.

use camino::{Utf8Path, Utf8PathBuf};
use upgrader_types::Report;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub dry: bool,
    pub extensions: Vec<String>,
    pub parser: Option<String>,
    pub cwd: Option<Utf8PathBuf>,
}

/// Applies a transform file to a list of source files.
///
/// The engine owns per-file categorization: its changed/unchanged/skipped/
/// error counts are reported as-is.
pub trait SourceTransformEngine {
    fn apply(
        &self,
        transform: &Utf8Path,
        paths: &[Utf8PathBuf],
        opts: &EngineOptions,
    ) -> anyhow::Result<Report>;
}

/// Engine used when none is configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableEngine;

impl SourceTransformEngine for UnavailableEngine {
    fn apply(
        &self,
        transform: &Utf8Path,
        _paths: &[Utf8PathBuf],
        _opts: &EngineOptions,
    ) -> anyhow::Result<Report> {
        anyhow::bail!("no source-transform engine configured to run {transform}")
    }
}
