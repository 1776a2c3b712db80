//! Domain logic for upgrader: which codemods apply to a project, and whether
//! the project may be upgraded at all.
//!
//! This crate owns *what* runs. Executing codemods belongs to
//! `upgrader-transform`; sequencing an upgrade belongs to `upgrader-core`.

pub mod error;
pub mod manifest;
pub mod project;
pub mod repository;
pub mod requirement;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use manifest::{FrameworkSpec, MANIFEST_FILE};
pub use project::{Project, ProjectKind, RunOptions, ScanPolicy};
pub use repository::{CodemodRepository, FindQuery};
pub use requirement::{Confirm, Requirement, RequirementChain};
pub use version::{Range, ReleaseType, Target};
