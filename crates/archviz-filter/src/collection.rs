//! The global filter registry and cascading recomputation.
//!
//! # Example
//!
//! ```
//! use archviz_filter::{Filter, FilterCollection, FilterGroup};
//! use std::rc::Rc;
//!
//! # fn main() -> archviz_filter::Result<()> {
//! let nodes = Rc::new(FilterGroup::new("nodes").with_filter(Filter::new(
//!     "name",
//!     |log: &mut Vec<String>, _| log.push("nodes.name".into()),
//! ))?);
//! let dependencies = Rc::new(FilterGroup::new("dependencies").with_filter(Filter::new(
//!     "visibleNodes",
//!     |log: &mut Vec<String>, _| {
//!         log.push("dependencies.visibleNodes".into());
//!     },
//! ))?);
//!
//! let collection = FilterCollection::builder()
//!     .add_filter_group(Rc::clone(&nodes))
//!     .add_filter_group(Rc::clone(&dependencies))
//!     .build()?;
//!
//! nodes
//!     .get_filter("name")?
//!     .add_dependent_filter_key("dependencies.visibleNodes")?;
//!
//! let mut log = Vec::new();
//! collection.update_filter("nodes.name", &mut log)?;
//! assert_eq!(log, vec!["nodes.name", "dependencies.visibleNodes"]);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::graph;
use crate::group::FilterGroup;
use crate::key::FilterKey;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Accumulates filter groups and produces a [`FilterCollection`].
pub struct FilterCollectionBuilder<C> {
    groups: Vec<Rc<FilterGroup<C>>>,
}

impl<C> FilterCollectionBuilder<C> {
    fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Register a group. Groups keep their registration order.
    pub fn add_filter_group(mut self, group: Rc<FilterGroup<C>>) -> Self {
        self.groups.push(group);
        self
    }

    /// Finalize the flattened `"<group>.<filter>"` index.
    ///
    /// Dependent keys declared before this call are validated here; keys
    /// declared afterwards are checked by [`FilterCollection::validate`] or
    /// by the first cascade reaching them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupName`] for an empty or dotted group name,
    /// [`Error::DuplicateGroup`] if two groups share a name, or a
    /// dependency-graph error from validation.
    pub fn build(self) -> Result<FilterCollection<C>> {
        let mut index = HashMap::new();
        let mut keys = Vec::new();

        for (group_index, group) in self.groups.iter().enumerate() {
            // Keys split at the first dot
            if group.name().is_empty() || group.name().contains('.') {
                return Err(Error::InvalidGroupName(group.name().to_string()));
            }
            if self.groups[..group_index]
                .iter()
                .any(|other| other.name() == group.name())
            {
                return Err(Error::DuplicateGroup(group.name().to_string()));
            }
            for filter_index in 0..group.len() {
                let key = group.key_for(group.filter_at(filter_index).name());
                index.insert(key.clone(), (group_index, filter_index));
                keys.push(key);
            }
        }

        let collection = FilterCollection {
            groups: self.groups,
            index,
            keys,
        };
        collection.validate()?;

        debug!(
            groups = collection.groups.len(),
            filters = collection.keys.len(),
            "Built filter collection"
        );
        Ok(collection)
    }
}

/// All filter groups of the application behind one key space.
///
/// The collection shares its groups with the components that own them; it
/// never copies filters. Its key index is fixed once built, while the
/// filters themselves stay mutable.
pub struct FilterCollection<C> {
    groups: Vec<Rc<FilterGroup<C>>>,
    index: HashMap<FilterKey, (usize, usize)>,
    keys: Vec<FilterKey>,
}

impl<C> FilterCollection<C> {
    /// Start building a collection.
    pub fn builder() -> FilterCollectionBuilder<C> {
        FilterCollectionBuilder::new()
    }

    /// Look up a filter by its `"<group>.<name>"` key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterNotFound`] if the key is not registered,
    /// including keys that are not of the `group.name` form at all.
    pub fn get_filter(&self, key: &str) -> Result<&Filter<C>> {
        FilterKey::parse(key)
            .ok()
            .and_then(|parsed| self.lookup(&parsed))
            .ok_or_else(|| Error::FilterNotFound {
                key: key.to_string(),
            })
    }

    /// Recompute the filter at `key` and, transitively, every dependent
    /// filter, depth-first in declaration order.
    ///
    /// The complete propagation order is computed before anything runs, so a
    /// missing or cyclic dependent key fails the call without evaluating any
    /// filter. When this returns `Ok`, every reachable filter has been
    /// recomputed against the latest state of `context`.
    ///
    /// Returns the number of evaluations performed.
    ///
    /// # Errors
    ///
    /// - [`Error::FilterNotFound`] if `key` is not registered
    /// - [`Error::DependentKeyNotFound`] if a reachable dependent key is unknown
    /// - [`Error::CyclicDependency`] if the reachable keys form a cycle
    pub fn update_filter(&self, key: &str, context: &mut C) -> Result<usize> {
        let root = FilterKey::parse(key).map_err(|_| Error::FilterNotFound {
            key: key.to_string(),
        })?;

        let order = graph::propagation_order(self, &root).inspect_err(|err| {
            if err.is_configuration_error() {
                warn!(key = %root, error = %err, "Filter cascade rejected");
            }
        })?;

        for key in &order {
            if let Some(filter) = self.lookup(key) {
                filter.evaluate(context);
            }
        }

        debug!(key = %root, evaluations = order.len(), "Filter cascade complete");
        Ok(order.len())
    }

    /// The keys [`update_filter`](Self::update_filter) would recompute for
    /// `key`, in order.
    ///
    /// # Errors
    ///
    /// Same as [`update_filter`](Self::update_filter).
    pub fn propagation_order(&self, key: &str) -> Result<Vec<FilterKey>> {
        let root = FilterKey::parse(key).map_err(|_| Error::FilterNotFound {
            key: key.to_string(),
        })?;
        graph::propagation_order(self, &root)
    }

    /// Check that every dependent key exists and the dependent-key graph is
    /// acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependentKeyNotFound`] or [`Error::CyclicDependency`].
    pub fn validate(&self) -> Result<()> {
        graph::validate_dependency_graph(self)
            .inspect_err(|err| warn!(error = %err, "Filter dependency graph is invalid"))
    }

    /// All keys in registration order.
    pub fn keys(&self) -> &[FilterKey] {
        &self.keys
    }

    /// The registered groups in registration order.
    pub fn groups(&self) -> &[Rc<FilterGroup<C>>] {
        &self.groups
    }

    /// Iterate over `(key, filter)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&FilterKey, &Filter<C>)> {
        self.keys
            .iter()
            .filter_map(|key| self.lookup(key).map(|filter| (key, filter)))
    }

    pub(crate) fn lookup(&self, key: &FilterKey) -> Option<&Filter<C>> {
        self.index
            .get(key)
            .map(|&(group, filter)| self.groups[group].filter_at(filter))
    }
}

impl<C> fmt::Debug for FilterCollection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCollection")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
