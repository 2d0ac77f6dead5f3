//! archviz-filter - named filter groups with cascading recomputation.
//!
//! Filters live in named [`FilterGroup`]s owned by the components that
//! define them. A [`FilterCollection`] joins the groups under one key space
//! (`"<group>.<name>"`) and knows how a change propagates: a filter may
//! declare dependent keys, and [`FilterCollection::update_filter`] recomputes
//! the triggered filter followed by everything reachable from it, depth-first
//! and synchronously.
//!
//! Filters are generic over a context type `C`. Evaluators receive the
//! context mutably and write their results into it, which keeps the filter
//! registry free of any knowledge about what is being filtered.
//!
//! The dependent-key graph must be acyclic. Cycles and dangling keys are
//! wiring bugs; they are reported by [`FilterCollection::validate`] and,
//! for keys declared late, by the first cascade that reaches them, before
//! any filter of that cascade runs.

#![forbid(unsafe_code)]

pub mod collection;
pub mod error;
pub mod filter;
pub mod group;
pub mod key;

mod graph;

pub use collection::{FilterCollection, FilterCollectionBuilder};
pub use error::{Error, Result};
pub use filter::{Evaluator, Filter, FilterPrecondition};
pub use group::FilterGroup;
pub use key::FilterKey;
