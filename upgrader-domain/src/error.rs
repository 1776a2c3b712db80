//! Error types for upgrader-domain.
//!
//! Configuration errors (manifest, dependency, directory) and precondition
//! failures are fatal and surface before anything is written to disk.

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// A string that should be a semantic version isn't one.
    #[error("invalid version: '{input}'")]
    InvalidVersion { input: String },

    /// An exact upgrade target that doesn't move forward.
    #[error("invalid target: {target} must be greater than the current version {current}")]
    InvalidTarget { current: String, target: String },

    /// A textual range that can't be parsed.
    #[error("invalid range: '{input}': {message}")]
    InvalidRange { input: String, message: String },

    /// The codemods root is missing or contains no version directories.
    #[error("invalid codemods repository at {root}: {message}")]
    InvalidRepository { root: Utf8PathBuf, message: String },

    /// The project manifest is missing or not a JSON object.
    #[error("invalid manifest at {path}: {message}")]
    InvalidManifest { path: Utf8PathBuf, message: String },

    /// The project tree could not be scanned.
    #[error("could not scan project at {root}: {message}")]
    ProjectScan { root: Utf8PathBuf, message: String },

    /// No version could be resolved for the framework dependency.
    #[error("missing dependency: could not resolve a version for '{package}' from {cwd}")]
    MissingDependency { package: String, cwd: Utf8PathBuf },

    /// A requirement failed and the chain was aborted.
    #[error("requirement failed: {name}: {message}")]
    RequirementFailed { name: String, message: String },
}

impl DomainError {
    /// Returns true if this error came from the requirement chain.
    pub fn is_requirement_failure(&self) -> bool {
        matches!(self, DomainError::RequirementFailed { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
