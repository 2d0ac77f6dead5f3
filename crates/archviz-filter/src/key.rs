//! Collection-wide filter keys.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Identifies a filter across all groups as `"<group>.<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    group: String,
    name: String,
}

impl FilterKey {
    /// Create a key from its group and filter name.
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse a `"<group>.<name>"` string.
    ///
    /// The group is everything before the first dot, so filter names may
    /// themselves contain dots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if either part is empty or the dot is
    /// missing.
    pub fn parse(key: &str) -> Result<Self> {
        match key.split_once('.') {
            Some((group, name)) if !group.is_empty() && !name.is_empty() => {
                Ok(Self::new(group, name))
            }
            _ => Err(Error::InvalidKey(key.to_string())),
        }
    }

    /// The group part of the key.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The filter name part of the key.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

impl FromStr for FilterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
