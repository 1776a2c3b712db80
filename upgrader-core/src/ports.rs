//! Port traits abstracting all I/O away from the pipelines.

use camino::Utf8Path;
use semver::Version;
use std::sync::Arc;
use upgrader_types::VersionedCollection;

pub use upgrader_domain::Confirm;

/// Git queries used by the precondition chain.
pub trait GitPort {
    fn is_installed(&self) -> anyhow::Result<bool>;
    fn is_repository(&self, root: &Utf8Path) -> anyhow::Result<bool>;
    /// `None` when `root` is not inside a repository.
    fn is_dirty(&self, root: &Utf8Path) -> anyhow::Result<Option<bool>>;
}

/// Published versions of a package.
pub trait RegistryPort {
    fn versions(&self, package: &str) -> anyhow::Result<Vec<Version>>;
}

/// The project's package manager.
pub trait PackageManagerPort {
    fn name(&self) -> &str;
    /// Registry URL configured for the package manager, if any.
    fn registry_url(&self, cwd: &Utf8Path) -> anyhow::Result<Option<String>>;
    fn install(&self, cwd: &Utf8Path) -> anyhow::Result<()>;
}

/// Narrows the matched codemod collections before they run.
pub type CodemodSelector =
    Arc<dyn Fn(Vec<VersionedCollection>) -> anyhow::Result<Vec<VersionedCollection>>>;

/// Selector that keeps every collection.
pub fn identity_selector() -> CodemodSelector {
    Arc::new(|collections: Vec<VersionedCollection>| -> anyhow::Result<Vec<VersionedCollection>> {
        Ok(collections)
    })
}
