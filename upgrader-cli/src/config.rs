//! Configuration file loading for upgrader.
//!
//! Discovers and loads `upgrader.toml` from the project root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;
use upgrader_core::settings::{DEFAULT_CODEMODS_DIR, EngineSettings, ProjectSettings};

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "upgrader.toml";

/// Top-level configuration from upgrader.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpgraderConfig {
    pub framework: FrameworkConfig,
    pub codemods: CodemodsConfig,
    pub registry: RegistryConfig,
    pub engine: EngineConfig,
    pub upgrade: UpgradeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Package whose version is upgraded, e.g. `@acme/core`.
    pub package: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodemodsConfig {
    /// Codemods directory, relative to the project root.
    pub dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Source-transform program (default: jscodeshift).
    pub program: Option<String>,
    /// Extra arguments placed before the generated ones.
    pub args: Vec<String>,
    pub parser: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Answer yes to every optional requirement prompt.
    pub auto_confirm: bool,
    /// Check git state before mutating anything.
    pub git_checks: bool,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            auto_confirm: false,
            git_checks: true,
        }
    }
}

/// Search for `upgrader.toml` in the project root.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<UpgraderConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<UpgraderConfig> {
    let config: UpgraderConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<UpgraderConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(UpgraderConfig::default()),
    }
}

/// CLI flags that override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub framework: Option<String>,
    pub codemods_dir: Option<Utf8PathBuf>,
    pub registry: Option<String>,
    pub yes: bool,
}

/// Config file and CLI arguments combined.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub framework: Option<String>,
    pub codemods_dir: Utf8PathBuf,
    pub registry_url: Option<String>,
    pub engine: EngineSettings,
    pub parser: Option<String>,
    pub auto_confirm: bool,
    pub git_checks: bool,
}

impl MergedConfig {
    pub fn framework_package(&self) -> anyhow::Result<&str> {
        self.framework.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "no framework package configured; pass --framework or set [framework].package in {}",
                CONFIG_FILE_NAME
            )
        })
    }

    pub fn project_settings(&self, project_path: &Utf8Path) -> anyhow::Result<ProjectSettings> {
        let mut settings = ProjectSettings::new(self.framework_package()?);
        settings.project_path = project_path.to_path_buf();
        settings.codemods_dir = self.codemods_dir.clone();
        settings.registry_url = self.registry_url.clone();
        Ok(settings)
    }

    /// Codemods directory resolved against the project path.
    pub fn codemods_root(&self, project_path: &Utf8Path) -> Utf8PathBuf {
        if self.codemods_dir.is_absolute() {
            self.codemods_dir.clone()
        } else {
            project_path.join(&self.codemods_dir)
        }
    }
}

pub struct ConfigMerger {
    config: UpgraderConfig,
}

impl ConfigMerger {
    pub fn new(config: UpgraderConfig) -> Self {
        Self { config }
    }

    /// CLI values replace file values; `--yes` can only turn confirmation on.
    pub fn merge(self, cli: &CliOverrides) -> MergedConfig {
        let UpgraderConfig {
            framework,
            codemods,
            registry,
            engine,
            upgrade,
        } = self.config;

        let mut engine_settings = EngineSettings::default();
        if let Some(program) = engine.program {
            engine_settings.program = program;
        }
        engine_settings.args = engine.args;

        MergedConfig {
            framework: cli.framework.clone().or(framework.package),
            codemods_dir: cli
                .codemods_dir
                .clone()
                .or(codemods.dir)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CODEMODS_DIR)),
            registry_url: cli.registry.clone().or(registry.url),
            engine: engine_settings,
            parser: engine.parser,
            auto_confirm: cli.yes || upgrade.auto_confirm,
            git_checks: upgrade.git_checks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
[framework]
package = "@acme/core"

[codemods]
dir = "migrations"

[registry]
url = "https://npm.internal.example"

[engine]
program = "npx"
args = ["jscodeshift"]
parser = "tsx"

[upgrade]
auto_confirm = true
git_checks = false
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.framework.package.as_deref(), Some("@acme/core"));
        assert_eq!(config.codemods.dir, Some(Utf8PathBuf::from("migrations")));
        assert_eq!(
            config.registry.url.as_deref(),
            Some("https://npm.internal.example")
        );
        assert_eq!(config.engine.program.as_deref(), Some("npx"));
        assert_eq!(config.engine.args, vec!["jscodeshift"]);
        assert_eq!(config.engine.parser.as_deref(), Some("tsx"));
        assert!(config.upgrade.auto_confirm);
        assert!(!config.upgrade.git_checks);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.framework.package.is_none());
        assert!(config.engine.args.is_empty());
        assert!(!config.upgrade.auto_confirm);
        assert!(config.upgrade.git_checks);
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = parse_config("[framework\npackage = 1").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = parse_config(
            r#"
[framework]
package = "@acme/core"
[codemods]
dir = "migrations"
[registry]
url = "https://from-file.example"
"#,
        )
        .unwrap();
        let cli = CliOverrides {
            framework: Some("@other/core".to_string()),
            codemods_dir: Some(Utf8PathBuf::from("/abs/codemods")),
            registry: None,
            yes: false,
        };

        let merged = ConfigMerger::new(config).merge(&cli);
        assert_eq!(merged.framework.as_deref(), Some("@other/core"));
        assert_eq!(merged.registry_url.as_deref(), Some("https://from-file.example"));
        assert_eq!(
            merged.codemods_root(Utf8Path::new("/project")),
            Utf8PathBuf::from("/abs/codemods")
        );
    }

    #[test]
    fn test_defaults_when_nothing_configured() {
        let merged = ConfigMerger::new(UpgraderConfig::default()).merge(&CliOverrides::default());
        assert_eq!(merged.engine.program, "jscodeshift");
        assert_eq!(
            merged.codemods_root(Utf8Path::new("/project")),
            Utf8PathBuf::from("/project/codemods")
        );
        assert!(merged.git_checks);
        let err = merged.framework_package().unwrap_err();
        assert!(err.to_string().contains("--framework"));
    }

    #[test]
    fn test_yes_flag_or_file_enables_auto_confirm() {
        let cli = CliOverrides {
            yes: true,
            ..CliOverrides::default()
        };
        assert!(ConfigMerger::new(UpgraderConfig::default()).merge(&cli).auto_confirm);

        let config = parse_config("[upgrade]\nauto_confirm = true\n").unwrap();
        assert!(ConfigMerger::new(config).merge(&CliOverrides::default()).auto_confirm);
    }

    #[test]
    fn test_project_settings_carry_merged_values() {
        let cli = CliOverrides {
            framework: Some("@acme/core".to_string()),
            registry: Some("https://r.example".to_string()),
            ..CliOverrides::default()
        };
        let merged = ConfigMerger::new(UpgraderConfig::default()).merge(&cli);
        let settings = merged.project_settings(Utf8Path::new("/project")).unwrap();
        assert_eq!(settings.framework, "@acme/core");
        assert_eq!(settings.registry_url.as_deref(), Some("https://r.example"));
        assert_eq!(settings.codemods_root(), Utf8PathBuf::from("/project/codemods"));
    }

    #[test]
    fn test_discover_config_some_and_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write config");
        assert!(discover_config(&root).is_some());
        assert!(load_or_default(&root).is_ok());
    }
}
