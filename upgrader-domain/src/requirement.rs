//! Preconditions checked before anything is written to disk.
//!
//! A requirement is a named check with optional children. Children only run
//! when their parent passes. A failing required check aborts the chain; a
//! failing optional check asks the user whether to continue, and when they
//! do, its children are skipped.

use crate::error::{DomainError, DomainResult};
use tracing::{debug, warn};

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&self, message: &str) -> anyhow::Result<bool>;
}

pub type RequirementCheck<C> = Box<dyn Fn(&C) -> anyhow::Result<()>>;

pub struct Requirement<C> {
    name: String,
    is_required: bool,
    check: RequirementCheck<C>,
    children: Vec<Requirement<C>>,
}

impl<C> Requirement<C> {
    pub fn required(
        name: impl Into<String>,
        check: impl Fn(&C) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self::new(name, true, check)
    }

    pub fn optional(
        name: impl Into<String>,
        check: impl Fn(&C) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self::new(name, false, check)
    }

    fn new(
        name: impl Into<String>,
        is_required: bool,
        check: impl Fn(&C) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            is_required,
            check: Box::new(check),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Requirement<C>) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn children(&self) -> &[Requirement<C>] {
        &self.children
    }

    pub fn test(&self, ctx: &C, confirm: &dyn Confirm) -> DomainResult<()> {
        let err = match (self.check)(ctx) {
            Ok(()) => {
                debug!(requirement = %self.name, "requirement passed");
                for child in &self.children {
                    child.test(ctx, confirm)?;
                }
                return Ok(());
            }
            Err(err) => err,
        };

        let failed = |message: String| DomainError::RequirementFailed {
            name: self.name.clone(),
            message,
        };

        if self.is_required {
            return Err(failed(format!("{err:#}")));
        }

        warn!(requirement = %self.name, error = %format!("{err:#}"), "optional requirement failed");
        let question = format!("{}: {err:#}. Continue anyway?", self.name);
        let proceed = confirm
            .confirm(&question)
            .map_err(|e| failed(format!("{err:#}; confirmation failed: {e:#}")))?;

        if proceed {
            debug!(requirement = %self.name, "continuing past optional requirement");
            Ok(())
        } else {
            Err(failed(format!("{err:#} (declined)")))
        }
    }
}

impl<C> std::fmt::Debug for Requirement<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.name)
            .field("is_required", &self.is_required)
            .field("children", &self.children)
            .finish()
    }
}

/// Root requirements tested in order.
#[derive(Debug)]
pub struct RequirementChain<C> {
    roots: Vec<Requirement<C>>,
}

impl<C> Default for RequirementChain<C> {
    fn default() -> Self {
        Self { roots: Vec::new() }
    }
}

impl<C> RequirementChain<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, requirement: Requirement<C>) -> Self {
        self.roots.push(requirement);
        self
    }

    pub fn push(&mut self, requirement: Requirement<C>) {
        self.roots.push(requirement);
    }

    pub fn extend(&mut self, requirements: impl IntoIterator<Item = Requirement<C>>) {
        self.roots.extend(requirements);
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn test(&self, ctx: &C, confirm: &dyn Confirm) -> DomainResult<()> {
        for root in &self.roots {
            root.test(ctx, confirm)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Answer(bool);

    impl Confirm for Answer {
        fn confirm(&self, _message: &str) -> anyhow::Result<bool> {
            Ok(self.0)
        }
    }

    fn pass(log: &Log, name: &'static str) -> impl Fn(&()) -> anyhow::Result<()> + 'static {
        let log = Rc::clone(log);
        move |_| {
            log.borrow_mut().push(name.to_string());
            Ok(())
        }
    }

    fn fail(log: &Log, name: &'static str) -> impl Fn(&()) -> anyhow::Result<()> + 'static {
        let log = Rc::clone(log);
        move |_| {
            log.borrow_mut().push(name.to_string());
            anyhow::bail!("{name} broke")
        }
    }

    #[test]
    fn children_run_after_parent_passes() {
        let log = Log::default();
        let req = Requirement::required("a", pass(&log, "a"))
            .with_child(Requirement::required("b", pass(&log, "b")))
            .with_child(Requirement::required("c", pass(&log, "c")));

        req.test(&(), &Answer(false)).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn required_failure_stops_immediately() {
        let log = Log::default();
        let chain = RequirementChain::new()
            .with(Requirement::required("a", fail(&log, "a")).with_child(Requirement::required("b", pass(&log, "b"))))
            .with(Requirement::required("c", pass(&log, "c")));

        let err = chain.test(&(), &Answer(true)).unwrap_err();
        assert!(matches!(err, DomainError::RequirementFailed { ref name, .. } if name == "a"));
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn accepted_optional_failure_skips_children_only() {
        let log = Log::default();
        let chain = RequirementChain::new()
            .with(Requirement::optional("a", fail(&log, "a")).with_child(Requirement::required("b", pass(&log, "b"))))
            .with(Requirement::required("c", pass(&log, "c")));

        chain.test(&(), &Answer(true)).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "c"]);
    }

    #[test]
    fn declined_optional_failure_aborts() {
        let log = Log::default();
        let chain = RequirementChain::new()
            .with(Requirement::optional("a", fail(&log, "a")))
            .with(Requirement::required("c", pass(&log, "c")));

        let err = chain.test(&(), &Answer(false)).unwrap_err();
        assert!(err.to_string().contains("declined"));
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn nested_required_failure_propagates() {
        let log = Log::default();
        let req = Requirement::optional("git", pass(&log, "git"))
            .with_child(Requirement::required("repo", fail(&log, "repo")));

        let err = req.test(&(), &Answer(true)).unwrap_err();
        assert!(matches!(err, DomainError::RequirementFailed { ref name, .. } if name == "repo"));
    }
}
