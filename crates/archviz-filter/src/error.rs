//! Error types for archviz-filter operations.
//!
//! Every variant describes a wiring mistake made by the code that assembles
//! filters, not a condition caused by user data. Callers are expected to
//! surface these immediately rather than recover from them.

use thiserror::Error;

/// The error type for filter registration, lookup and recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No filter is registered under the given collection key.
    #[error("Filter not found: {key}")]
    FilterNotFound {
        /// The `"<group>.<name>"` key that was requested.
        key: String,
    },

    /// A filter group has no filter with the given name.
    #[error("Filter '{name}' not found in group '{group}'")]
    FilterNotInGroup {
        /// Name of the group that was searched.
        group: String,
        /// Name of the missing filter.
        name: String,
    },

    /// A key string is not of the form `"<group>.<name>"`.
    #[error("Invalid filter key '{0}': expected '<group>.<name>'")]
    InvalidKey(String),

    /// A group name is empty or contains a dot, so its keys would not parse.
    #[error("Invalid filter group name '{0}': must be non-empty and contain no '.'")]
    InvalidGroupName(String),

    /// Two groups with the same name were added to one collection.
    #[error("Filter group registered twice: {0}")]
    DuplicateGroup(String),

    /// Two filters with the same name were added to one group.
    #[error("Filter '{name}' registered twice in group '{group}'")]
    DuplicateFilter {
        /// Name of the group.
        group: String,
        /// Name of the duplicated filter.
        name: String,
    },

    /// A filter declares a dependent key that no registered filter has.
    #[error("Filter {from} declares unknown dependent filter {to}")]
    DependentKeyNotFound {
        /// Key of the filter declaring the dependency.
        from: String,
        /// The dependent key that does not exist.
        to: String,
    },

    /// The dependent-key graph contains a cycle.
    #[error("Cyclic filter dependency: {}", path.join(" -> "))]
    CyclicDependency {
        /// Keys forming the cycle, with the first key repeated at the end.
        path: Vec<String>,
    },
}

impl Error {
    /// Returns `true` for errors caused by inconsistent filter wiring.
    ///
    /// Lookups of unknown keys are reported separately because they may
    /// originate from a single bad call rather than from the wiring itself.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGroupName(_)
                | Self::DuplicateGroup(_)
                | Self::DuplicateFilter { .. }
                | Self::DependentKeyNotFound { .. }
                | Self::CyclicDependency { .. }
        )
    }

    /// Returns `true` if a filter lookup failed.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FilterNotFound { .. } | Self::FilterNotInGroup { .. }
        )
    }
}

/// A specialized Result type for archviz-filter operations.
pub type Result<T> = std::result::Result<T, Error>;
