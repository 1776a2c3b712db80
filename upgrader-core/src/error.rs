//! Error types for upgrader-core.
//!
//! Stage errors abort an upgrade; they are surfaced to callers as the
//! `error` of a failure report and can be recovered with `downcast_ref`.

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpgradeError {
    /// No published version satisfies the requested release type.
    #[error("no published version of {package} matches {range}")]
    NoCandidate { package: String, range: String },

    /// The requested target is the version already installed.
    #[error("already up to date: {package} is at {version}")]
    AlreadyUpToDate { package: String, version: String },

    /// A codemod uid that the repository doesn't know.
    #[error("unknown codemod: {uid}")]
    UnknownCodemod { uid: String },

    /// The registry couldn't be queried.
    #[error("could not fetch versions of {package} from the registry: {source:#}")]
    Registry {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    /// Reinstalling dependencies failed.
    #[error("{manager} install failed: {source:#}")]
    Install {
        manager: String,
        #[source]
        source: anyhow::Error,
    },

    /// The manifest couldn't be rewritten.
    #[error("could not update manifest {path}: {source:#}")]
    Manifest {
        path: Utf8PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
