//! Clap-free settings for the upgrade and codemod pipelines.

use camino::Utf8PathBuf;
use semver::Version;
use upgrader_domain::{Range, ReleaseType, Target};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_CODEMODS_DIR: &str = "codemods";

/// Settings for `Upgrader::upgrade`.
#[derive(Debug, Clone)]
pub struct UpgradeSettings {
    pub target: Target,
    /// Upper bound for codemods when it differs from the dependency target.
    pub codemods_target: Option<Version>,
    pub dry: bool,
    /// Parser hint for the code engine.
    pub parser: Option<String>,
    /// Run the git precondition chain.
    pub git_checks: bool,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            target: Target::Release(ReleaseType::Minor),
            codemods_target: None,
            dry: false,
            parser: None,
            git_checks: true,
        }
    }
}

/// What `codemods run` executes.
#[derive(Debug, Clone, Default)]
pub enum CodemodSelection {
    /// Codemods between the installed version and the latest codemod version.
    #[default]
    Pending,
    Range(Range),
    Uid(String),
}

/// Settings for standalone codemod runs.
#[derive(Debug, Clone, Default)]
pub struct CodemodSettings {
    pub selection: CodemodSelection,
    pub dry: bool,
    pub parser: Option<String>,
}

/// External source-transform engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            program: "jscodeshift".to_string(),
            args: Vec::new(),
        }
    }
}

/// Where codemods and the project live.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub project_path: Utf8PathBuf,
    pub codemods_dir: Utf8PathBuf,
    pub framework: String,
    pub registry_url: Option<String>,
}

impl ProjectSettings {
    pub fn new(framework: impl Into<String>) -> Self {
        Self {
            project_path: Utf8PathBuf::from("."),
            codemods_dir: Utf8PathBuf::from(DEFAULT_CODEMODS_DIR),
            framework: framework.into(),
            registry_url: None,
        }
    }

    /// Codemods directory, resolved against the project path when relative.
    pub fn codemods_root(&self) -> Utf8PathBuf {
        if self.codemods_dir.is_absolute() {
            self.codemods_dir.clone()
        } else {
            self.project_path.join(&self.codemods_dir)
        }
    }
}
