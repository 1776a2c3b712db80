//! Loading document codemods.
//!
//! Transforms are either registered in-process (keyed by codemod uid or
//! name) or read from a declarative RFC 6902 patch file next to the version
//! directory's other codemods.

use crate::document::{DocumentApi, DocumentFile, DocumentTransform};
use crate::error::TransformError;
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use upgrader_types::Codemod;

pub trait DocumentTransformLoader {
    fn load(&self, codemod: &Codemod) -> anyhow::Result<Arc<dyn DocumentTransform>>;
}

/// A JSON Patch applied to the working copy.
#[derive(Debug, Clone)]
pub struct PatchTransform {
    patch: json_patch::Patch,
}

impl PatchTransform {
    pub fn new(patch: json_patch::Patch) -> Self {
        Self { patch }
    }

    /// Read a patch from `.json`, `.yaml` or `.yml`.
    pub fn from_file(path: &Utf8Path) -> Result<Self, TransformError> {
        let load_err = |message: String| TransformError::Load {
            path: path.to_string(),
            message,
        };

        let contents = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let patch: json_patch::Patch = match path.extension() {
            Some("json") => serde_json::from_str(&contents).map_err(|e| load_err(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&contents).map_err(|e| load_err(e.to_string()))?
            }
            other => {
                return Err(load_err(format!(
                    "no transform registered and '.{}' is not a patch format",
                    other.unwrap_or("")
                )));
            }
        };
        Ok(Self::new(patch))
    }
}

impl DocumentTransform for PatchTransform {
    fn transform(
        &self,
        _file: &DocumentFile,
        api: &mut DocumentApi,
    ) -> anyhow::Result<Option<Value>> {
        json_patch::patch(api.root_mut(), &self.patch).context("apply json patch")?;
        Ok(Some(api.root().clone()))
    }
}

/// In-process transforms with a patch-file fallback.
#[derive(Clone, Default)]
pub struct RegisteredTransforms {
    transforms: HashMap<String, Arc<dyn DocumentTransform>>,
}

impl RegisteredTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under a codemod uid (`5.0.0-bump-document`) or
    /// bare name (`bump`). Uids win over names.
    pub fn register(
        mut self,
        key: impl Into<String>,
        transform: impl DocumentTransform + 'static,
    ) -> Self {
        self.transforms.insert(key.into(), Arc::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl DocumentTransformLoader for RegisteredTransforms {
    fn load(&self, codemod: &Codemod) -> anyhow::Result<Arc<dyn DocumentTransform>> {
        let uid = codemod.uid();
        if let Some(t) = self
            .transforms
            .get(&uid)
            .or_else(|| self.transforms.get(codemod.name()))
        {
            debug!(uid = %uid, "using registered document transform");
            return Ok(Arc::clone(t));
        }

        let path = codemod.path();
        debug!(uid = %uid, path = %path, "loading document patch");
        let patch = PatchTransform::from_file(&path)?;
        Ok(Arc::new(patch))
    }
}
