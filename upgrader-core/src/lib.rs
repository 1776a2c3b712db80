//! Embeddable core library for upgrader.
//!
//! Provides clap-free entry points for upgrading a project and running
//! codemods, with all I/O behind port traits.
//!
//! # Port traits
//!
//! - [`GitPort`](ports::GitPort): repository state for preconditions
//! - [`RegistryPort`](ports::RegistryPort): published framework versions
//! - [`PackageManagerPort`](ports::PackageManagerPort): registry config and reinstall
//! - [`Confirm`](ports::Confirm): yes/no questions for optional requirements
//!
//! The [`adapters`] module provides process- and HTTP-backed implementations.
//!
//! # Entry points
//!
//! - [`Upgrader::upgrade`](upgrader::Upgrader::upgrade): the full upgrade pipeline
//! - [`CodemodRunner::run`](codemod_runner::CodemodRunner::run): codemods for a range
//! - [`CodemodRunner::run_by_uid`](codemod_runner::CodemodRunner::run_by_uid): one codemod
//! - [`run_codemods`](codemod_runner::run_codemods): codemods named by [`CodemodSettings`](settings::CodemodSettings)

pub mod adapters;
pub mod codemod_runner;
pub mod error;
pub mod ports;
pub mod requirements;
pub mod settings;
pub mod upgrader;

pub use codemod_runner::{CodemodRunner, CodemodRunnerReport, run_codemods};
pub use error::UpgradeError;
pub use upgrader::{UpgradePorts, UpgradeReport, Upgrader};

// Re-export domain types so embedders don't need upgrader-domain directly.
pub use upgrader_domain::{
    CodemodRepository, DomainError, FrameworkSpec, Project, Range, ReleaseType, Target,
};
