//! Per-run state.
//!
//! A [`RunContext`] is created for each upgrade or codemod run and dropped
//! with it. It owns the run id and tracing span, the runner table, and the
//! services runners need: the source-transform engine, the document loader
//! and the cache of loaded document transforms.

use crate::document::DocumentTransform;
use crate::engine::{SourceTransformEngine, UnavailableEngine};
use crate::error::TransformResult;
use crate::loader::DocumentTransformLoader;
use crate::runner::{RunnerConfig, RunnerTable};
use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Span, debug};
use upgrader_types::{Codemod, Report};
use uuid::Uuid;

pub struct RunServices {
    engine: Box<dyn SourceTransformEngine>,
    loader: Box<dyn DocumentTransformLoader>,
    cache: HashMap<String, Arc<dyn DocumentTransform>>,
}

impl RunServices {
    /// Services with the given document loader and no code engine.
    pub fn new(loader: impl DocumentTransformLoader + 'static) -> Self {
        Self {
            engine: Box::new(UnavailableEngine),
            loader: Box::new(loader),
            cache: HashMap::new(),
        }
    }

    pub fn with_engine(mut self, engine: impl SourceTransformEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn engine(&self) -> &dyn SourceTransformEngine {
        self.engine.as_ref()
    }

    /// Load a document transform once per run, keyed by codemod uid.
    pub fn document_transform(
        &mut self,
        codemod: &Codemod,
    ) -> anyhow::Result<Arc<dyn DocumentTransform>> {
        let uid = codemod.uid();
        if let Some(t) = self.cache.get(&uid) {
            return Ok(Arc::clone(t));
        }
        let loaded = self.loader.load(codemod)?;
        self.cache.insert(uid, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn cached_transforms(&self) -> usize {
        self.cache.len()
    }
}

pub struct RunContext {
    run_id: Uuid,
    span: Span,
    runners: RunnerTable,
    services: RunServices,
}

impl RunContext {
    /// `operation` names the span (`upgrade`, `codemods`).
    pub fn new(operation: &'static str, services: RunServices) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", operation, run_id = %run_id);
        Self {
            run_id,
            span,
            runners: RunnerTable::default(),
            services,
        }
    }

    pub fn with_runners(mut self, runners: RunnerTable) -> Self {
        self.runners = runners;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn runners(&self) -> &RunnerTable {
        &self.runners
    }

    pub fn services(&self) -> &RunServices {
        &self.services
    }

    /// File extensions the runner for `codemod` consumes.
    pub fn extensions_for(&self, codemod: &Codemod) -> TransformResult<&'static [&'static str]> {
        Ok(self.runners.runner_for(codemod)?.extensions())
    }

    /// Dispatch `codemod` to the runner for its kind.
    pub fn run_codemod(
        &mut self,
        codemod: &Codemod,
        paths: &[Utf8PathBuf],
        config: &RunnerConfig,
    ) -> TransformResult<Report> {
        let _enter = self.span.enter();
        let runner = self.runners.runner_for(codemod)?;
        debug!(uid = %codemod.uid(), files = paths.len(), dry = config.dry, "running codemod");
        runner.run(codemod, paths, config, &mut self.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentApi, DocumentFile};
    use crate::loader::RegisteredTransforms;
    use semver::Version;
    use std::cell::Cell;
    use std::rc::Rc;
    use upgrader_types::CodemodKind;

    struct CountingLoader {
        loads: Rc<Cell<usize>>,
    }

    impl DocumentTransformLoader for CountingLoader {
        fn load(&self, _codemod: &Codemod) -> anyhow::Result<Arc<dyn DocumentTransform>> {
            self.loads.set(self.loads.get() + 1);
            Ok(Arc::new(|_: &DocumentFile, api: &mut DocumentApi| -> anyhow::Result<Option<serde_json::Value>> {
                Ok(Some(api.root().clone()))
            }))
        }
    }

    #[test]
    fn transforms_are_loaded_once_per_run() {
        let loads = Rc::new(Cell::new(0));
        let mut services = RunServices::new(CountingLoader {
            loads: Rc::clone(&loads),
        });
        let c = Codemod::new(
            CodemodKind::Document,
            Version::new(1, 0, 0),
            "/c/1.0.0",
            "a.document.json",
        );

        services.document_transform(&c).unwrap();
        services.document_transform(&c).unwrap();

        assert_eq!(loads.get(), 1);
        assert_eq!(services.cached_transforms(), 1);
    }

    #[test]
    fn each_context_gets_its_own_id() {
        let a = RunContext::new("codemods", RunServices::new(RegisteredTransforms::new()));
        let b = RunContext::new("codemods", RunServices::new(RegisteredTransforms::new()));
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn extensions_follow_codemod_kind() {
        let ctx = RunContext::new("codemods", RunServices::new(RegisteredTransforms::new()));
        let doc = Codemod::new(
            CodemodKind::Document,
            Version::new(1, 0, 0),
            "/c/1.0.0",
            "a.document.json",
        );
        assert_eq!(ctx.extensions_for(&doc).unwrap(), &["json"]);
    }
}
