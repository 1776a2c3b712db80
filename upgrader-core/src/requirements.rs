//! Builtin preconditions for upgrades.

use crate::ports::GitPort;
use camino::Utf8PathBuf;
use semver::Version;
use std::sync::Arc;
use upgrader_domain::Requirement;

/// What requirement checks can see during an upgrade.
pub struct UpgradeContext {
    pub cwd: Utf8PathBuf,
    /// Installed framework version; `None` for plugins.
    pub current: Option<Version>,
    pub target: Version,
    /// Published versions, ascending.
    pub available: Vec<Version>,
    pub git: Arc<dyn GitPort>,
}

pub type UpgradeRequirement = Requirement<UpgradeContext>;

/// Major upgrades start from the newest release of the current major and
/// need the next major to be published.
pub fn major_upgrade_requirements() -> Vec<UpgradeRequirement> {
    vec![
        Requirement::required("current version is the latest of its major", |ctx: &UpgradeContext| {
            let Some(current) = &ctx.current else {
                return Ok(());
            };
            let newer_in_major = ctx
                .available
                .iter()
                .filter(|v| v.major == current.major && v.pre.is_empty())
                .filter(|v| *v > current)
                .max();
            match newer_in_major {
                Some(latest) => anyhow::bail!(
                    "{current} is not the latest {}.x release; upgrade to {latest} first",
                    current.major
                ),
                None => Ok(()),
            }
        }),
        Requirement::required("next major version is available", |ctx: &UpgradeContext| {
            let next = ctx.current.as_ref().map_or(ctx.target.major, |c| c.major + 1);
            if ctx
                .available
                .iter()
                .any(|v| v.major == next && v.pre.is_empty())
            {
                Ok(())
            } else {
                anyhow::bail!("no {next}.x release has been published")
            }
        }),
    ]
}

/// git installed, then project inside a repository, then a clean working tree.
pub fn git_requirements() -> UpgradeRequirement {
    let clean = Requirement::optional("git working tree is clean", |ctx: &UpgradeContext| {
        match ctx.git.is_dirty(&ctx.cwd)? {
            Some(false) => Ok(()),
            Some(true) => anyhow::bail!("uncommitted changes in {}", ctx.cwd),
            None => anyhow::bail!("could not read git status in {}", ctx.cwd),
        }
    });

    let repository = Requirement::optional("project is a git repository", |ctx: &UpgradeContext| {
        if ctx.git.is_repository(&ctx.cwd)? {
            Ok(())
        } else {
            anyhow::bail!("{} is not inside a git repository", ctx.cwd)
        }
    })
    .with_child(clean);

    Requirement::optional("git is installed", |ctx: &UpgradeContext| {
        if ctx.git.is_installed()? {
            Ok(())
        } else {
            anyhow::bail!("git executable not found")
        }
    })
    .with_child(repository)
}
