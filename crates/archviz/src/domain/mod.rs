//! Input documents and shared domain types.
//!
//! A graph document describes the node tree (packages containing classes and
//! interfaces, possibly nested) and the dependencies between its leaves. A
//! violations document groups some of those dependencies by the
//! architecture rule they break.
//!
//! ```json
//! {
//!   "root": {
//!     "fullName": "com.example", "name": "example", "type": "package",
//!     "children": [
//!       { "fullName": "com.example.Service", "name": "Service", "type": "interface" }
//!     ]
//!   },
//!   "dependencies": [
//!     { "originClass": "com.example.Impl", "targetClass": "com.example.Service",
//!       "type": "INHERITANCE" }
//!   ]
//! }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Kind of a node in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A package grouping other nodes
    Package,

    /// A class
    Class,

    /// An interface
    Interface,
}

/// Type of a dependency between two classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    /// Extends or implements
    Inheritance,

    /// Calls a constructor
    ConstructorCall,

    /// Calls a method
    MethodCall,

    /// Reads or writes a field
    FieldAccess,
}

impl DependencyKind {
    /// All kinds, in menu order.
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Inheritance,
        DependencyKind::ConstructorCall,
        DependencyKind::MethodCall,
        DependencyKind::FieldAccess,
    ];
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Inheritance => "INHERITANCE",
            Self::ConstructorCall => "CONSTRUCTOR_CALL",
            Self::MethodCall => "METHOD_CALL",
            Self::FieldAccess => "FIELD_ACCESS",
        };
        f.write_str(label)
    }
}

/// Which node types the node type filter lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeTypeFilter {
    /// Show interfaces
    pub show_interfaces: bool,

    /// Show classes
    pub show_classes: bool,
}

impl NodeTypeFilter {
    /// Whether the filter hides anything at all.
    pub fn is_restricting(&self) -> bool {
        !(self.show_interfaces && self.show_classes)
    }
}

impl Default for NodeTypeFilter {
    fn default() -> Self {
        Self {
            show_interfaces: true,
            show_classes: true,
        }
    }
}

/// Which dependency kinds the dependency type filter hides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTypeFilter {
    /// Kinds that are currently hidden
    #[serde(default)]
    pub hidden: BTreeSet<DependencyKind>,
}

impl DependencyTypeFilter {
    /// A filter hiding the given kinds.
    pub fn hiding(kinds: impl IntoIterator<Item = DependencyKind>) -> Self {
        Self {
            hidden: kinds.into_iter().collect(),
        }
    }

    /// Whether dependencies of this kind pass the filter.
    pub fn shows(&self, kind: DependencyKind) -> bool {
        !self.hidden.contains(&kind)
    }
}

/// A node of the graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonNode {
    /// Fully qualified name, unique within the document
    pub full_name: String,

    /// Simple name shown in the visualization
    pub name: String,

    /// Node kind
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Contained nodes
    #[serde(default)]
    pub children: Vec<JsonNode>,
}

/// A dependency of the graph document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDependency {
    /// Full name of the depending class
    pub origin_class: String,

    /// Full name of the class depended upon
    pub target_class: String,

    /// Dependency kind
    #[serde(rename = "type")]
    pub kind: DependencyKind,

    /// Optional human readable detail
    #[serde(default)]
    pub description: String,
}

/// The complete graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Root of the node hierarchy
    pub root: JsonNode,

    /// Dependencies between leaves of the hierarchy
    #[serde(default)]
    pub dependencies: Vec<JsonDependency>,
}

/// One violating dependency, referenced by its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonViolation {
    /// Full name of the depending class
    pub origin_class: String,

    /// Full name of the class depended upon
    pub target_class: String,
}

/// All violations of one architecture rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonViolationsGroup {
    /// Rule description, used as the group's identity
    pub rule: String,

    /// Dependencies violating the rule
    #[serde(default)]
    pub violations: Vec<JsonViolation>,
}

/// The complete violations document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationsDocument {
    /// Violation groups in document order
    pub groups: Vec<JsonViolationsGroup>,
}

impl GraphDocument {
    /// Load a graph document from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ViolationsDocument {
    /// Load a violations document from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
