//! `package.json` access: which dependency is the framework, how its scoped
//! siblings are found, and how versions are rewritten.

use crate::error::{DomainError, DomainResult};
use crate::version;
use camino::Utf8Path;
use fs_err as fs;
use semver::Version;
use serde_json::Value;

pub const MANIFEST_FILE: &str = "package.json";

/// Identifies the framework dependency of a project.
///
/// `scope` is derived from the package name: `@acme/core` has scope `@acme`,
/// and every `@acme/*` dependency is a scoped dependency. Unscoped packages
/// are their own scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkSpec {
    pub package: String,
    pub scope: String,
}

impl FrameworkSpec {
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        let scope = match package.split_once('/') {
            Some((scope, _)) if scope.starts_with('@') => scope.to_string(),
            _ => package.clone(),
        };
        Self { package, scope }
    }

    pub fn is_scoped(&self, dependency: &str) -> bool {
        if self.scope.starts_with('@') {
            dependency
                .strip_prefix(self.scope.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        } else {
            dependency == self.package
        }
    }

    /// Manifest key holding framework metadata (`"acme": { "kind": "plugin" }`).
    pub fn manifest_key(&self) -> &str {
        self.scope.trim_start_matches('@')
    }
}

pub fn read_manifest(path: &Utf8Path) -> DomainResult<Value> {
    let invalid = |message: String| DomainError::InvalidManifest {
        path: path.to_path_buf(),
        message,
    };
    let contents = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
    if !value.is_object() {
        return Err(invalid("expected a JSON object".to_string()));
    }
    Ok(value)
}

/// Serialize with two-space indentation and a trailing newline, keeping key order.
pub fn to_manifest_string(value: &Value) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

pub fn write_manifest(path: &Utf8Path, value: &Value) -> anyhow::Result<()> {
    let contents = to_manifest_string(value)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Scoped `dependencies` entries as `(name, value)` pairs, in manifest order.
pub fn scoped_dependencies(manifest: &Value, framework: &FrameworkSpec) -> Vec<(String, String)> {
    manifest
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter(|(name, _)| framework.is_scoped(name))
                .filter_map(|(name, value)| value.as_str().map(|v| (name.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// The framework package's declared version, if it is a literal semver.
pub fn declared_framework_version(manifest: &Value, framework: &FrameworkSpec) -> Option<Version> {
    manifest
        .get("dependencies")
        .and_then(|deps| deps.get(&framework.package))
        .and_then(Value::as_str)
        .filter(|raw| version::is_literal(raw))
        .and_then(|raw| Version::parse(raw).ok())
}

/// Pin every scoped dependency currently equal to `from` to `to`.
///
/// Returns the names of the rewritten dependencies. Entries with any other
/// value (ranges, tags, other versions) are left untouched.
pub fn bump_scoped_dependencies(
    manifest: &mut Value,
    framework: &FrameworkSpec,
    from: &Version,
    to: &Version,
) -> Vec<String> {
    let from = from.to_string();
    let to = to.to_string();

    let Some(deps) = manifest.get_mut("dependencies").and_then(Value::as_object_mut) else {
        return Vec::new();
    };

    let mut bumped = Vec::new();
    for (name, value) in deps.iter_mut() {
        if framework.is_scoped(name) && value.as_str() == Some(from.as_str()) {
            *value = Value::String(to.clone());
            bumped.push(name.clone());
        }
    }
    bumped
}
