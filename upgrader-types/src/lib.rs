//! Shared value types for the upgrader workspace.
//!
//! # Design constraints
//! - Codemods and collections are immutable once built by a repository scan.
//! - Reports are serialized for `--report` output; prefer adding optional
//!   fields over changing semantics.

pub mod codemod;
pub mod report;

pub use codemod::{Codemod, CodemodKind, VersionedCollection};
pub use report::{CodemodReport, Report, ReportTotals};

/// Schema identifiers.
pub mod schema {
    pub const UPGRADER_RUN_V1: &str = "upgrader.run.v1";
}
