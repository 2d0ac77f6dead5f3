//! A single named filter and its precondition.

use crate::error::Result;
use crate::key::FilterKey;
use std::cell::{Cell, RefCell};
use std::fmt;
use tracing::trace;

/// Recomputes a filter's result inside the context `C`.
///
/// The evaluator reads the current precondition together with whatever
/// state the context carries (node visibility, violation flags, ...) and
/// stores its result back into the context.
pub type Evaluator<C> = Box<dyn FnMut(&mut C, &FilterPrecondition)>;

/// The mutable switch deciding whether a filter restricts anything.
///
/// A disabled filter still runs when recomputed; its evaluator is expected
/// to produce the "let everything through" result in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPrecondition {
    /// Whether the filter currently restricts its input.
    pub filter_is_enabled: bool,
}

impl FilterPrecondition {
    /// A precondition with the given enabled state.
    #[must_use]
    pub fn new(filter_is_enabled: bool) -> Self {
        Self { filter_is_enabled }
    }
}

impl Default for FilterPrecondition {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A named predicate that can be recomputed on demand.
///
/// Filters are mutated in place and never replaced: the precondition and
/// the dependent keys use interior mutability so that both the owning
/// component and the [`FilterCollection`](crate::FilterCollection) can
/// adjust them through shared references.
pub struct Filter<C> {
    name: String,
    precondition: Cell<FilterPrecondition>,
    evaluator: RefCell<Evaluator<C>>,
    dependent_keys: RefCell<Vec<FilterKey>>,
    evaluations: Cell<u64>,
}

impl<C> Filter<C> {
    /// Create an enabled filter.
    pub fn new<F>(name: impl Into<String>, evaluator: F) -> Self
    where
        F: FnMut(&mut C, &FilterPrecondition) + 'static,
    {
        Self::with_precondition(name, FilterPrecondition::default(), evaluator)
    }

    /// Create a filter that starts out disabled.
    pub fn disabled<F>(name: impl Into<String>, evaluator: F) -> Self
    where
        F: FnMut(&mut C, &FilterPrecondition) + 'static,
    {
        Self::with_precondition(name, FilterPrecondition::new(false), evaluator)
    }

    /// Create a filter with an explicit initial precondition.
    pub fn with_precondition<F>(
        name: impl Into<String>,
        precondition: FilterPrecondition,
        evaluator: F,
    ) -> Self
    where
        F: FnMut(&mut C, &FilterPrecondition) + 'static,
    {
        Self {
            name: name.into(),
            precondition: Cell::new(precondition),
            evaluator: RefCell::new(Box::new(evaluator)),
            dependent_keys: RefCell::new(Vec::new()),
            evaluations: Cell::new(0),
        }
    }

    /// The filter's name within its group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A copy of the current precondition.
    pub fn precondition(&self) -> FilterPrecondition {
        self.precondition.get()
    }

    /// Whether the filter currently restricts its input.
    pub fn is_enabled(&self) -> bool {
        self.precondition.get().filter_is_enabled
    }

    /// Enable or disable the filter. Takes effect on the next evaluation.
    pub fn set_enabled(&self, enabled: bool) {
        self.precondition.set(FilterPrecondition::new(enabled));
    }

    /// Declare that recomputing this filter requires recomputing `key` next.
    ///
    /// Declaring the same key twice has no effect. The key is not resolved
    /// here; unknown targets are reported by
    /// [`FilterCollection::validate`](crate::FilterCollection::validate) and
    /// by the first cascade that reaches them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`](crate::Error::InvalidKey) if `key` is not
    /// of the form `"<group>.<name>"`.
    pub fn add_dependent_filter_key(&self, key: &str) -> Result<()> {
        let key = FilterKey::parse(key)?;
        let mut keys = self.dependent_keys.borrow_mut();
        if !keys.contains(&key) {
            keys.push(key);
        }
        Ok(())
    }

    /// Dependent keys in declaration order.
    pub fn dependent_keys(&self) -> Vec<FilterKey> {
        self.dependent_keys.borrow().clone()
    }

    /// How often this filter has been evaluated.
    pub fn evaluations(&self) -> u64 {
        self.evaluations.get()
    }

    /// Recompute this filter alone, without touching dependent filters.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly from this filter's own evaluator.
    pub fn evaluate(&self, context: &mut C) {
        trace!(filter = %self.name, enabled = self.is_enabled(), "Evaluating filter");
        let precondition = self.precondition.get();
        (self.evaluator.borrow_mut())(context, &precondition);
        self.evaluations.set(self.evaluations.get() + 1);
    }
}

impl<C> fmt::Debug for Filter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("precondition", &self.precondition.get())
            .field("dependent_keys", &self.dependent_keys.borrow())
            .field("evaluations", &self.evaluations.get())
            .field("evaluator", &"<dyn FnMut>")
            .finish()
    }
}
