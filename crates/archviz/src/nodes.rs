//! The hierarchical node tree and its filter group.
//!
//! Nodes are stored in an arena in depth-first preorder, so every child has a
//! larger index than its parent. Filter results are kept per node as two
//! vectors: what the node itself satisfies, and whether the node passes once
//! its descendants are taken into account (a package stays when anything
//! inside it stays).
//!
//! # Filters
//!
//! The `"nodes"` group contains:
//!
//! | Filter              | Recomputes                                         |
//! |---------------------|----------------------------------------------------|
//! | `name`              | matches against the name filter string             |
//! | `type`              | interface / class visibility                       |
//! | `typeAndName`       | nodes passing both of the above                    |
//! | `visibleViolations` | nodes involved in visible violations (if enabled)  |
//! | `combinedFilter`    | nodes passing every node filter                    |
//!
//! with `name -> typeAndName`, `type -> typeAndName`,
//! `typeAndName -> combinedFilter` and `visibleViolations -> combinedFilter`
//! declared inside the group.

use crate::dependencies::{DependencyLookup, FoldListener};
use crate::domain::{JsonNode, NodeType, NodeTypeFilter};
use crate::error::{Error, Result};
use crate::scene::Scene;
use archviz_filter::{Filter, FilterGroup};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Name of the node filter group.
pub const NODES_GROUP: &str = "nodes";

/// Name filter.
pub const NAME_FILTER: &str = "name";

/// Node type filter.
pub const TYPE_FILTER: &str = "type";

/// Conjunction of the name and type filters.
pub const TYPE_AND_NAME_FILTER: &str = "typeAndName";

/// Hides nodes not involved in any visible violation.
pub const VISIBLE_VIOLATIONS_FILTER: &str = "visibleViolations";

/// Conjunction of every node filter.
pub const COMBINED_FILTER: &str = "combinedFilter";

/// Index of a node in its [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in preorder.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read access to the node tree, as needed by the dependency set.
pub trait NodeLookup {
    /// Resolve a fully qualified name.
    fn find(&self, full_name: &str) -> Option<NodeId>;

    /// The parent of a node, `None` for the root.
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Whether the node passes the type-and-name filter.
    fn passes_type_and_name(&self, id: NodeId) -> bool;

    /// Whether the node passes every node filter.
    fn passes_combined(&self, id: NodeId) -> bool;

    /// The visible node standing in for `id`: `id` itself, or its outermost
    /// folded ancestor. `None` if the node is filtered out.
    fn visible_representative(&self, id: NodeId) -> Option<NodeId>;

    /// Whether `id` lies strictly inside `ancestor`.
    fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool;
}

#[derive(Debug)]
struct Node {
    full_name: String,
    name: String,
    node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
    folded: bool,
}

/// Parsed name filter string.
///
/// Patterns are separated by `|` or `,`; `*` matches any sequence and a
/// leading `~` turns a pattern into an exclusion. A pattern matches when it
/// occurs anywhere in a node's full name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct NamePatterns {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl NamePatterns {
    fn parse(filter: &str) -> Self {
        let mut patterns = Self::default();
        for raw in filter.split(['|', ',']).map(str::trim) {
            if let Some(excluded) = raw.strip_prefix('~') {
                let excluded = excluded.trim();
                if !excluded.is_empty() {
                    patterns.excludes.push(excluded.to_string());
                }
            } else if !raw.is_empty() {
                patterns.includes.push(raw.to_string());
            }
        }
        patterns
    }

    fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    fn matches(&self, full_name: &str) -> bool {
        let included = self.includes.is_empty()
            || self
                .includes
                .iter()
                .any(|pattern| pattern_matches(full_name, pattern));
        included
            && !self
                .excludes
                .iter()
                .any(|pattern| pattern_matches(full_name, pattern))
    }
}

fn pattern_matches(full_name: &str, pattern: &str) -> bool {
    let mut rest = full_name;
    for part in pattern.split('*').filter(|part| !part.is_empty()) {
        match rest.find(part) {
            Some(position) => rest = &rest[position + part.len()..],
            None => return false,
        }
    }
    true
}

/// Filter results per node, indexed by `NodeId`.
#[derive(Debug, Default)]
struct NodeFilterState {
    name_self: Vec<bool>,
    name: Vec<bool>,
    type_self: Vec<bool>,
    node_type: Vec<bool>,
    type_and_name: Vec<bool>,
    violations_self: Vec<bool>,
    violations: Vec<bool>,
    combined: Vec<bool>,
}

impl NodeFilterState {
    fn all_passing(len: usize) -> Self {
        let all = vec![true; len];
        Self {
            name_self: all.clone(),
            name: all.clone(),
            type_self: all.clone(),
            node_type: all.clone(),
            type_and_name: all.clone(),
            violations_self: all.clone(),
            violations: all.clone(),
            combined: all,
        }
    }
}

/// The node hierarchy with fold state and node filters.
pub struct NodeTree {
    nodes: Vec<Node>,
    by_name: HashMap<String, NodeId>,
    name_filter_string: String,
    type_filter: NodeTypeFilter,
    state: NodeFilterState,
    filter_group: Rc<FilterGroup<Scene>>,
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.nodes.len())
            .field("name_filter_string", &self.name_filter_string)
            .field("type_filter", &self.type_filter)
            .finish_non_exhaustive()
    }
}

impl NodeTree {
    /// Build the tree from the document's root node.
    ///
    /// Nothing is folded and no filter restricts anything yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if two nodes share a full name.
    pub fn from_document(root: &JsonNode) -> Result<Self> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut by_name = HashMap::new();
        let mut stack: Vec<(&JsonNode, Option<NodeId>, usize)> = vec![(root, None, 0)];

        while let Some((json, parent, depth)) = stack.pop() {
            let id = NodeId(nodes.len());
            if by_name.insert(json.full_name.clone(), id).is_some() {
                return Err(Error::InvalidDocument(format!(
                    "duplicate node '{}'",
                    json.full_name
                )));
            }
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }
            nodes.push(Node {
                full_name: json.full_name.clone(),
                name: json.name.clone(),
                node_type: json.node_type,
                parent,
                children: Vec::new(),
                depth,
                folded: false,
            });
            // Reverse so children pop in document order
            for child in json.children.iter().rev() {
                stack.push((child, Some(id), depth + 1));
            }
        }

        let state = NodeFilterState::all_passing(nodes.len());
        debug!(nodes = nodes.len(), "Built node tree");

        Ok(Self {
            nodes,
            by_name,
            name_filter_string: String::new(),
            type_filter: NodeTypeFilter::default(),
            state,
            filter_group: Rc::new(build_filter_group()?),
        })
    }

    /// The `"nodes"` filter group, shared with the filter collection.
    pub fn filter_group(&self) -> &Rc<FilterGroup<Scene>> {
        &self.filter_group
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes. Never true for a loaded document.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a full name or fail.
    pub fn require(&self, full_name: &str) -> Result<NodeId> {
        self.find(full_name)
            .ok_or_else(|| Error::UnknownNode(full_name.to_string()))
    }

    /// Fully qualified name.
    pub fn full_name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].full_name
    }

    /// Simple name.
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Node kind.
    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.nodes[id.0].node_type
    }

    /// Direct children in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Distance from the root.
    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// Whether the node is currently folded.
    pub fn is_folded(&self, id: NodeId) -> bool {
        self.nodes[id.0].folded
    }

    /// All strict ancestors, root first.
    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes[id.0].parent;
        while let Some(node) = current {
            chain.push(node);
            current = self.nodes[node.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Whether the node passes every filter and no ancestor is folded.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.state.combined[id.0]
            && self
                .predecessors(id)
                .iter()
                .all(|ancestor| !self.nodes[ancestor.0].folded)
    }

    /// Visible nodes in preorder, starting with the root.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut visible = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if !self.state.combined[id.0] {
                continue;
            }
            visible.push(id);
            if !self.nodes[id.0].folded {
                stack.extend(self.nodes[id.0].children.iter().rev().copied());
            }
        }
        visible
    }

    // ========== Fold state ==========

    /// Fold a node. The root and leaves cannot be folded.
    ///
    /// Returns `true` if the fold state changed.
    pub fn fold(&mut self, id: NodeId, listener: &mut impl FoldListener) -> bool {
        self.set_folded(id, true, listener)
    }

    /// Unfold a node.
    ///
    /// Returns `true` if the fold state changed.
    pub fn unfold(&mut self, id: NodeId, listener: &mut impl FoldListener) -> bool {
        self.set_folded(id, false, listener)
    }

    fn set_folded(&mut self, id: NodeId, folded: bool, listener: &mut impl FoldListener) -> bool {
        if id == self.root() || self.is_leaf(id) || self.nodes[id.0].folded == folded {
            return false;
        }
        self.nodes[id.0].folded = folded;
        listener.on_fold_changed(id, folded);
        true
    }

    /// Fold every node that can be folded.
    pub fn fold_all_nodes(&mut self, listener: &mut impl FoldListener) {
        let mut changed = 0usize;
        for index in 0..self.nodes.len() {
            if self.fold(NodeId(index), listener) {
                changed += 1;
            }
        }
        debug!(changed, "Folded all nodes");
    }

    /// Call `visitor` on every ancestor of `id`, root first, then on `id`.
    pub fn call_on_every_predecessor_then_self(
        &mut self,
        id: NodeId,
        mut visitor: impl FnMut(&mut Self, NodeId),
    ) {
        for node in self.predecessors(id) {
            visitor(self, node);
        }
        visitor(self, id);
    }

    /// Fold the outermost nodes that contain none of `nodes`.
    ///
    /// Walks down from the root; a node whose subtree is disjoint from
    /// `nodes` is folded and not descended into, every other node is left as
    /// it is and its children are examined.
    pub fn fold_nodes_with_minimum_depth_that_have_not_descendants(
        &mut self,
        nodes: &HashSet<NodeId>,
        listener: &mut impl FoldListener,
    ) {
        let marked = self.close_upwards(|index| nodes.contains(&NodeId(index)));
        let mut stack: Vec<NodeId> = self.children(self.root()).to_vec();
        let mut folded = 0usize;

        while let Some(id) = stack.pop() {
            if self.is_leaf(id) {
                continue;
            }
            if marked[id.0] {
                stack.extend(self.nodes[id.0].children.iter().copied());
            } else if self.fold(id, listener) {
                folded += 1;
            }
        }
        debug!(folded, "Folded nodes without violations");
    }

    // ========== Filter preconditions ==========

    /// The current name filter string.
    pub fn name_filter_string(&self) -> &str {
        &self.name_filter_string
    }

    /// Replace the name filter string. Takes effect when `nodes.name` is
    /// recomputed.
    pub fn set_name_filter_string(&mut self, filter: impl Into<String>) {
        self.name_filter_string = filter.into();
    }

    /// The current node type filter.
    pub fn type_filter(&self) -> NodeTypeFilter {
        self.type_filter
    }

    /// Replace the node type filter. Takes effect when `nodes.type` is
    /// recomputed.
    pub fn change_type_filter(&mut self, show_interfaces: bool, show_classes: bool) {
        self.type_filter = NodeTypeFilter {
            show_interfaces,
            show_classes,
        };
    }

    /// Whether the node passes the name filter.
    pub fn passes_name(&self, id: NodeId) -> bool {
        self.state.name[id.0]
    }

    /// Whether the node passes the type filter.
    pub fn passes_type(&self, id: NodeId) -> bool {
        self.state.node_type[id.0]
    }

    /// Whether the node passes the visible-violations filter.
    pub fn passes_visible_violations(&self, id: NodeId) -> bool {
        self.state.violations[id.0]
    }

    // ========== Filter evaluation ==========

    fn apply_name_filter(&mut self) {
        let patterns = NamePatterns::parse(&self.name_filter_string);
        let own: Vec<bool> = self
            .nodes
            .iter()
            .map(|node| {
                patterns.is_empty()
                    || (node.node_type != NodeType::Package && patterns.matches(&node.full_name))
            })
            .collect();
        self.state.name = self.close_upwards(|index| own[index]);
        self.state.name_self = own;
    }

    fn apply_type_filter(&mut self) {
        let filter = self.type_filter;
        let own: Vec<bool> = self
            .nodes
            .iter()
            .map(|node| match node.node_type {
                NodeType::Package => !filter.is_restricting(),
                NodeType::Interface => filter.show_interfaces,
                NodeType::Class => filter.show_classes,
            })
            .collect();
        self.state.node_type = self.close_upwards(|index| own[index]);
        self.state.type_self = own;
    }

    fn apply_type_and_name_filter(&mut self) {
        let passing = self.close_upwards(|index| {
            self.state.name_self[index] && self.state.type_self[index]
        });
        self.state.type_and_name = passing;
    }

    fn apply_visible_violations_filter(
        &mut self,
        enabled: bool,
        dependencies: &impl DependencyLookup,
    ) {
        let own: Vec<bool> = if enabled {
            let involved = dependencies.visible_violations_node_filter();
            self.nodes
                .iter()
                .enumerate()
                .map(|(index, node)| {
                    node.node_type != NodeType::Package && involved.contains(&NodeId(index))
                })
                .collect()
        } else {
            vec![true; self.nodes.len()]
        };
        self.state.violations = self.close_upwards(|index| own[index]);
        self.state.violations_self = own;
    }

    fn apply_combined_filter(&mut self) {
        let passing = self.close_upwards(|index| {
            self.state.name_self[index]
                && self.state.type_self[index]
                && self.state.violations_self[index]
        });
        self.state.combined = passing;
    }

    /// Mark every node satisfying `own`, plus all of its ancestors. The root
    /// always passes.
    fn close_upwards(&self, own: impl Fn(usize) -> bool) -> Vec<bool> {
        let mut passing = vec![false; self.nodes.len()];
        for index in (0..self.nodes.len()).rev() {
            if own(index) {
                passing[index] = true;
            }
            if passing[index] {
                if let Some(parent) = self.nodes[index].parent {
                    passing[parent.0] = true;
                }
            }
        }
        if let Some(root) = passing.first_mut() {
            *root = true;
        }
        passing
    }
}

impl NodeLookup for NodeTree {
    fn find(&self, full_name: &str) -> Option<NodeId> {
        self.by_name.get(full_name).copied()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    fn passes_type_and_name(&self, id: NodeId) -> bool {
        self.state.type_and_name[id.0]
    }

    fn passes_combined(&self, id: NodeId) -> bool {
        self.state.combined[id.0]
    }

    fn visible_representative(&self, id: NodeId) -> Option<NodeId> {
        if !self.state.combined[id.0] {
            return None;
        }
        let outermost_folded = self
            .predecessors(id)
            .into_iter()
            .find(|ancestor| self.nodes[ancestor.0].folded);
        Some(outermost_folded.unwrap_or(id))
    }

    fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes[id.0].parent;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node.0].parent;
        }
        false
    }
}

fn build_filter_group() -> Result<FilterGroup<Scene>> {
    let group = FilterGroup::new(NODES_GROUP)
        .with_filter(Filter::new(NAME_FILTER, |scene: &mut Scene, _| {
            scene.nodes.apply_name_filter();
        }))?
        .with_filter(Filter::new(TYPE_FILTER, |scene: &mut Scene, _| {
            scene.nodes.apply_type_filter();
        }))?
        .with_filter(Filter::new(TYPE_AND_NAME_FILTER, |scene: &mut Scene, _| {
            scene.nodes.apply_type_and_name_filter();
        }))?
        .with_filter(Filter::disabled(
            VISIBLE_VIOLATIONS_FILTER,
            |scene: &mut Scene, precondition| {
                let Scene {
                    nodes,
                    dependencies,
                    ..
                } = scene;
                nodes.apply_visible_violations_filter(
                    precondition.filter_is_enabled,
                    &*dependencies,
                );
            },
        ))?
        .with_filter(Filter::new(COMBINED_FILTER, |scene: &mut Scene, _| {
            scene.nodes.apply_combined_filter();
        }))?;

    let type_and_name = format!("{NODES_GROUP}.{TYPE_AND_NAME_FILTER}");
    let combined = format!("{NODES_GROUP}.{COMBINED_FILTER}");
    group
        .get_filter(NAME_FILTER)?
        .add_dependent_filter_key(&type_and_name)?;
    group
        .get_filter(TYPE_FILTER)?
        .add_dependent_filter_key(&type_and_name)?;
    group
        .get_filter(TYPE_AND_NAME_FILTER)?
        .add_dependent_filter_key(&combined)?;
    group
        .get_filter(VISIBLE_VIOLATIONS_FILTER)?
        .add_dependent_filter_key(&combined)?;

    Ok(group)
}
