//! Named, ordered collections of filters.

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::key::FilterKey;

/// A namespace of related filters owned by one component.
///
/// The owning component usually wraps the group in an `Rc` and hands a
/// clone to the [`FilterCollection`](crate::FilterCollection), so both sides
/// observe the same filters. Filters keep their registration order.
#[derive(Debug)]
pub struct FilterGroup<C> {
    name: String,
    filters: Vec<Filter<C>>,
}

impl<C> FilterGroup<C> {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: Vec::new(),
        }
    }

    /// Add a filter, builder style.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFilter`] if a filter with the same name is
    /// already registered.
    pub fn with_filter(mut self, filter: Filter<C>) -> Result<Self> {
        self.add_filter(filter)?;
        Ok(self)
    }

    /// Add a filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFilter`] if a filter with the same name is
    /// already registered.
    pub fn add_filter(&mut self, filter: Filter<C>) -> Result<()> {
        if self.position(filter.name()).is_some() {
            return Err(Error::DuplicateFilter {
                group: self.name.clone(),
                name: filter.name().to_string(),
            });
        }
        self.filters.push(filter);
        Ok(())
    }

    /// The group's namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a filter by its name within this group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterNotInGroup`] if no such filter exists.
    pub fn get_filter(&self, name: &str) -> Result<&Filter<C>> {
        self.position(name)
            .map(|index| &self.filters[index])
            .ok_or_else(|| Error::FilterNotInGroup {
                group: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Filters in registration order.
    pub fn filters(&self) -> impl Iterator<Item = &Filter<C>> {
        self.filters.iter()
    }

    /// The collection key a filter of this group is registered under.
    pub fn key_for(&self, filter_name: &str) -> FilterKey {
        FilterKey::new(self.name.clone(), filter_name)
    }

    pub(crate) fn filter_at(&self, index: usize) -> &Filter<C> {
        &self.filters[index]
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.filters.iter().position(|f| f.name() == name)
    }

    pub(crate) fn len(&self) -> usize {
        self.filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Filter<()> {
        Filter::new(name, |_, _| {})
    }

    #[test]
    fn test_get_filter() {
        let group = FilterGroup::new("nodes")
            .with_filter(noop("name"))
            .unwrap()
            .with_filter(noop("type"))
            .unwrap();

        assert_eq!(group.get_filter("type").unwrap().name(), "type");
        let names: Vec<&str> = group.filters().map(Filter::name).collect();
        assert_eq!(names, vec!["name", "type"]);
    }

    #[test]
    fn test_get_filter_not_found() {
        let group = FilterGroup::new("nodes").with_filter(noop("name")).unwrap();

        let err = group.get_filter("combinedFilter").unwrap_err();
        assert_eq!(
            err,
            Error::FilterNotInGroup {
                group: "nodes".into(),
                name: "combinedFilter".into(),
            }
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_duplicate_filter_rejected() {
        let err = FilterGroup::new("dependencies")
            .with_filter(noop("type"))
            .unwrap()
            .with_filter(noop("type"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateFilter { .. }));
    }

    #[test]
    fn test_key_for() {
        let group: FilterGroup<()> = FilterGroup::new("dependencies");
        assert_eq!(
            group.key_for("violations").to_string(),
            "dependencies.violations"
        );
    }
}
