//! Error types for upgrader-transform.
//!
//! Per-file failures never surface here: runners count them in the report.
//! These errors abort a whole codemod.

use thiserror::Error;
use upgrader_types::CodemodKind;

#[derive(Debug, Error)]
pub enum TransformError {
    /// A runner was asked to run a codemod of another kind.
    #[error("invalid codemod {uid}: {kind} codemods cannot run on the {runner} runner")]
    InvalidCodemod {
        uid: String,
        kind: CodemodKind,
        runner: CodemodKind,
    },

    /// No runner is registered for the codemod's kind.
    #[error("no runner registered for {kind} codemod {uid}")]
    NoRunner { uid: String, kind: CodemodKind },

    /// The source-transform engine failed as a whole.
    #[error("source-transform engine failed for {uid}: {source:#}")]
    Engine {
        uid: String,
        #[source]
        source: anyhow::Error,
    },

    /// A document codemod could not be loaded.
    #[error("could not load document codemod {path}: {message}")]
    Load { path: String, message: String },
}

pub type TransformResult<T> = Result<T, TransformError>;
