//! Codemod execution for upgrader.
//!
//! Responsibilities:
//! - Dispatch codemods to the runner for their kind (`RunnerTable`).
//! - Run code codemods through a pluggable source-transform engine.
//! - Run document codemods in-process over JSON files.
//! - Scope engine, loader and transform cache to one run (`RunContext`).

pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod loader;
pub mod runner;

pub use context::{RunContext, RunServices};
pub use document::{DocumentApi, DocumentFile, DocumentTransform, PathError};
pub use engine::{EngineOptions, SourceTransformEngine, UnavailableEngine};
pub use error::{TransformError, TransformResult};
pub use loader::{DocumentTransformLoader, PatchTransform, RegisteredTransforms};
pub use runner::{
    CODE_EXTENSIONS, CodeRunner, DOCUMENT_EXTENSIONS, DocumentRunner, RunnerConfig, RunnerTable,
    TransformRunner,
};
