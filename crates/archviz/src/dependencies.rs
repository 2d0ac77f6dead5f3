//! Dependencies between nodes, violations groups, and the dependency filters.
//!
//! Raw dependencies always connect two nodes of the document. What gets
//! rendered are *visible* dependencies: every dependency passing all filters
//! is lifted to the visible representatives of its endpoints (the endpoint
//! itself, or its outermost folded ancestor), and dependencies landing on the
//! same pair of visible nodes are merged into one link.
//!
//! The `"dependencies"` filter group contains `type`, `nodeTypeAndName`,
//! `violations` and `visibleNodes`. Every cascade in the graph ends in
//! `visibleNodes`, which rebuilds the visible links.

use crate::domain::{DependencyKind, DependencyTypeFilter, JsonDependency, ViolationsDocument};
use crate::error::{Error, Result};
use crate::nodes::{NodeId, NodeLookup};
use crate::scene::Scene;
use archviz_filter::{Filter, FilterGroup};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Name of the dependency filter group.
pub const DEPENDENCIES_GROUP: &str = "dependencies";

/// Dependency type filter.
pub const TYPE_FILTER: &str = "type";

/// Keeps dependencies whose endpoints pass the node type-and-name filter.
pub const NODE_TYPE_AND_NAME_FILTER: &str = "nodeTypeAndName";

/// Keeps only dependencies of visible violations (if enabled).
pub const VIOLATIONS_FILTER: &str = "violations";

/// Keeps dependencies whose endpoints pass every node filter.
pub const VISIBLE_NODES_FILTER: &str = "visibleNodes";

/// Informed whenever a node is folded or unfolded.
pub trait FoldListener {
    /// `node` was folded (`folded == true`) or unfolded.
    fn on_fold_changed(&mut self, node: NodeId, folded: bool);
}

/// Read access to the dependency set, as needed by the node tree.
pub trait DependencyLookup {
    /// Endpoints of every visible violation passing the type and
    /// type-and-name filters.
    fn visible_violations_node_filter(&self) -> HashSet<NodeId>;
}

/// A dependency from the graph document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Depending node
    pub origin: NodeId,

    /// Node depended upon
    pub target: NodeId,

    /// Dependency kind
    pub kind: DependencyKind,

    /// Human readable detail
    pub description: String,
}

/// The violations of one rule, shown or hidden together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationsGroup {
    rule: String,
    dependencies: Vec<usize>,
    visible: bool,
}

impl ViolationsGroup {
    /// The violated rule.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Indices of the violating dependencies.
    pub fn dependencies(&self) -> &[usize] {
        &self.dependencies
    }

    /// Whether the group's violations are currently shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// A rendered link between two visible nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleDependency {
    /// Visible node standing in for the origins
    pub origin: NodeId,

    /// Visible node standing in for the targets
    pub target: NodeId,

    /// Kinds of all merged dependencies
    pub kinds: BTreeSet<DependencyKind>,

    /// Number of merged dependencies
    pub count: usize,

    /// Whether any merged dependency belongs to a visible violation
    pub contains_violation: bool,
}

#[derive(Debug)]
struct DependencyFilterState {
    by_type: Vec<bool>,
    node_type_and_name: Vec<bool>,
    violations: Vec<bool>,
    visible_nodes: Vec<bool>,
}

impl DependencyFilterState {
    fn all_passing(len: usize) -> Self {
        Self {
            by_type: vec![true; len],
            node_type_and_name: vec![true; len],
            violations: vec![true; len],
            visible_nodes: vec![true; len],
        }
    }
}

/// All dependencies of the graph with their filter state.
pub struct DependencySet {
    dependencies: Vec<Dependency>,
    violations_groups: Vec<ViolationsGroup>,
    type_filter: DependencyTypeFilter,
    state: DependencyFilterState,
    visible: Vec<VisibleDependency>,
    stale: bool,
    filter_group: Rc<FilterGroup<Scene>>,
}

impl fmt::Debug for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencySet")
            .field("dependencies", &self.dependencies.len())
            .field("violations_groups", &self.violations_groups.len())
            .field("visible", &self.visible.len())
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

impl DependencySet {
    /// Resolve the document's dependencies and violations against the node
    /// tree.
    ///
    /// Violations without a matching dependency are skipped with a warning.
    /// Every violations group starts hidden.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if a dependency names a node the
    /// tree does not contain.
    pub fn new(
        dependencies: &[JsonDependency],
        violations: &ViolationsDocument,
        nodes: &impl NodeLookup,
    ) -> Result<Self> {
        let dependencies = dependencies
            .iter()
            .map(|json| {
                Ok(Dependency {
                    origin: resolve(nodes, &json.origin_class)?,
                    target: resolve(nodes, &json.target_class)?,
                    kind: json.kind,
                    description: json.description.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let violations_groups = resolve_violations(&dependencies, violations, nodes);
        let len = dependencies.len();
        debug!(
            dependencies = len,
            violations_groups = violations_groups.len(),
            "Built dependency set"
        );

        Ok(Self {
            dependencies,
            violations_groups,
            type_filter: DependencyTypeFilter::default(),
            state: DependencyFilterState::all_passing(len),
            visible: Vec::new(),
            stale: true,
            filter_group: Rc::new(build_filter_group()?),
        })
    }

    /// The `"dependencies"` filter group, shared with the filter collection.
    pub fn filter_group(&self) -> &Rc<FilterGroup<Scene>> {
        &self.filter_group
    }

    /// Every dependency of the document, filtered or not.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Violations groups in document order.
    pub fn violations_groups(&self) -> &[ViolationsGroup] {
        &self.violations_groups
    }

    /// Whether the dependency at `index` passes every dependency filter.
    pub fn passes(&self, index: usize) -> bool {
        self.state.by_type[index]
            && self.state.node_type_and_name[index]
            && self.state.violations[index]
            && self.state.visible_nodes[index]
    }

    /// Whether fold changes happened since the visible links were rebuilt.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    // ========== Visible links ==========

    /// The links to render, sorted by endpoints.
    pub fn all_dependencies(&self) -> &[VisibleDependency] {
        &self.visible
    }

    /// Rebuild the visible links from the current filter and fold state.
    pub fn recreate_visible(&mut self, nodes: &impl NodeLookup) {
        let in_violation = self.visible_violation_mask();
        let mut merged: BTreeMap<(NodeId, NodeId), VisibleDependency> = BTreeMap::new();

        for (index, dependency) in self.dependencies.iter().enumerate() {
            if !self.passes(index) {
                continue;
            }
            let (Some(origin), Some(target)) = (
                nodes.visible_representative(dependency.origin),
                nodes.visible_representative(dependency.target),
            ) else {
                continue;
            };
            if origin == target {
                continue;
            }
            let link = merged
                .entry((origin, target))
                .or_insert_with(|| VisibleDependency {
                    origin,
                    target,
                    kinds: BTreeSet::new(),
                    count: 0,
                    contains_violation: false,
                });
            link.kinds.insert(dependency.kind);
            link.count += 1;
            link.contains_violation |= in_violation[index];
        }

        self.visible = merged.into_values().collect();
        self.stale = false;
        debug!(links = self.visible.len(), "Recreated visible dependencies");
    }

    /// Visible links with both ends strictly inside `node`.
    pub fn dependencies_directly_within_node(
        &self,
        node: NodeId,
        nodes: &impl NodeLookup,
    ) -> Vec<&VisibleDependency> {
        self.visible
            .iter()
            .filter(|link| {
                nodes.is_descendant_of(link.origin, node) && nodes.is_descendant_of(link.target, node)
            })
            .collect()
    }

    /// Visible links starting or ending at `node`.
    pub fn dependencies_of_node(&self, node: NodeId) -> Vec<&VisibleDependency> {
        self.visible
            .iter()
            .filter(|link| link.origin == node || link.target == node)
            .collect()
    }

    /// Filtered-in dependencies with an endpoint at or below `node`,
    /// regardless of folding.
    pub fn dependencies_of_leaves_within_node(
        &self,
        node: NodeId,
        nodes: &impl NodeLookup,
    ) -> Vec<&Dependency> {
        let within = |id: NodeId| id == node || nodes.is_descendant_of(id, node);
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(index, dependency)| {
                self.passes(*index) && (within(dependency.origin) || within(dependency.target))
            })
            .map(|(_, dependency)| dependency)
            .collect()
    }

    // ========== Violations ==========

    /// Parents of every node involved in a visible violation. Unfolding these
    /// and their ancestors makes every violation endpoint visible.
    pub fn nodes_containing_violations(&self, nodes: &impl NodeLookup) -> HashSet<NodeId> {
        self.nodes_involved_in_visible_violations()
            .into_iter()
            .filter_map(|node| nodes.parent(node))
            .collect()
    }

    /// Endpoints of every filtered-in visible violation.
    pub fn nodes_involved_in_visible_violations(&self) -> HashSet<NodeId> {
        let in_violation = self.visible_violation_mask();
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                in_violation[*index]
                    && self.state.by_type[*index]
                    && self.state.node_type_and_name[*index]
            })
            .flat_map(|(_, dependency)| [dependency.origin, dependency.target])
            .collect()
    }

    /// Show the violations of `rule`. Takes effect when
    /// `dependencies.violations` is recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownViolationsGroup`] if no group has this rule.
    pub fn show_violations(&mut self, rule: &str) -> Result<()> {
        self.set_violations_visible(rule, true)
    }

    /// Hide the violations of `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownViolationsGroup`] if no group has this rule.
    pub fn hide_violations(&mut self, rule: &str) -> Result<()> {
        self.set_violations_visible(rule, false)
    }

    fn set_violations_visible(&mut self, rule: &str, visible: bool) -> Result<()> {
        let group = self
            .violations_groups
            .iter_mut()
            .find(|group| group.rule == rule)
            .ok_or_else(|| Error::UnknownViolationsGroup(rule.to_string()))?;
        group.visible = visible;
        debug!(rule, visible, "Changed violations visibility");
        Ok(())
    }

    fn visible_violation_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.dependencies.len()];
        for group in self.violations_groups.iter().filter(|group| group.visible) {
            for &index in &group.dependencies {
                mask[index] = true;
            }
        }
        mask
    }

    // ========== Type filter ==========

    /// Kinds occurring in the document, in menu order.
    pub fn dependency_types(&self) -> Vec<DependencyKind> {
        let present: HashSet<DependencyKind> =
            self.dependencies.iter().map(|dependency| dependency.kind).collect();
        DependencyKind::ALL
            .into_iter()
            .filter(|kind| present.contains(kind))
            .collect()
    }

    /// The current dependency type filter.
    pub fn type_filter(&self) -> &DependencyTypeFilter {
        &self.type_filter
    }

    /// Replace the type filter. Takes effect when `dependencies.type` is
    /// recomputed.
    pub fn change_type_filter(&mut self, filter: DependencyTypeFilter) {
        self.type_filter = filter;
    }

    // ========== Filter evaluation ==========

    fn apply_type_filter(&mut self) {
        self.state.by_type = self
            .dependencies
            .iter()
            .map(|dependency| self.type_filter.shows(dependency.kind))
            .collect();
    }

    fn apply_node_type_and_name_filter(&mut self, nodes: &impl NodeLookup) {
        self.state.node_type_and_name = self
            .dependencies
            .iter()
            .map(|dependency| {
                nodes.passes_type_and_name(dependency.origin)
                    && nodes.passes_type_and_name(dependency.target)
            })
            .collect();
    }

    fn apply_violations_filter(&mut self, enabled: bool) {
        self.state.violations = if enabled {
            self.visible_violation_mask()
        } else {
            vec![true; self.dependencies.len()]
        };
    }

    fn apply_visible_nodes_filter(&mut self, nodes: &impl NodeLookup) {
        self.state.visible_nodes = self
            .dependencies
            .iter()
            .map(|dependency| {
                nodes.passes_combined(dependency.origin) && nodes.passes_combined(dependency.target)
            })
            .collect();
        self.recreate_visible(nodes);
    }
}

impl FoldListener for DependencySet {
    fn on_fold_changed(&mut self, node: NodeId, folded: bool) {
        debug!(%node, folded, "Fold state changed");
        self.stale = true;
    }
}

impl DependencyLookup for DependencySet {
    fn visible_violations_node_filter(&self) -> HashSet<NodeId> {
        self.nodes_involved_in_visible_violations()
    }
}

fn resolve(nodes: &impl NodeLookup, full_name: &str) -> Result<NodeId> {
    nodes.find(full_name).ok_or_else(|| {
        Error::InvalidDocument(format!("dependency references unknown node '{full_name}'"))
    })
}

fn resolve_violations(
    dependencies: &[Dependency],
    violations: &ViolationsDocument,
    nodes: &impl NodeLookup,
) -> Vec<ViolationsGroup> {
    let mut by_endpoints: HashMap<(NodeId, NodeId), Vec<usize>> = HashMap::new();
    for (index, dependency) in dependencies.iter().enumerate() {
        by_endpoints
            .entry((dependency.origin, dependency.target))
            .or_default()
            .push(index);
    }

    violations
        .groups
        .iter()
        .map(|json| {
            let mut matched = BTreeSet::new();
            for violation in &json.violations {
                let endpoints = nodes
                    .find(&violation.origin_class)
                    .zip(nodes.find(&violation.target_class));
                match endpoints.and_then(|endpoints| by_endpoints.get(&endpoints)) {
                    Some(indices) => matched.extend(indices.iter().copied()),
                    None => warn!(
                        rule = %json.rule,
                        origin = %violation.origin_class,
                        target = %violation.target_class,
                        "Skipping violation without matching dependency"
                    ),
                }
            }
            ViolationsGroup {
                rule: json.rule.clone(),
                dependencies: matched.into_iter().collect(),
                visible: false,
            }
        })
        .collect()
}

fn build_filter_group() -> Result<FilterGroup<Scene>> {
    let group = FilterGroup::new(DEPENDENCIES_GROUP)
        .with_filter(Filter::new(TYPE_FILTER, |scene: &mut Scene, _| {
            scene.dependencies.apply_type_filter();
        }))?
        .with_filter(Filter::new(
            NODE_TYPE_AND_NAME_FILTER,
            |scene: &mut Scene, _| {
                let Scene {
                    nodes,
                    dependencies,
                    ..
                } = scene;
                dependencies.apply_node_type_and_name_filter(&*nodes);
            },
        ))?
        .with_filter(Filter::disabled(
            VIOLATIONS_FILTER,
            |scene: &mut Scene, precondition| {
                scene
                    .dependencies
                    .apply_violations_filter(precondition.filter_is_enabled);
            },
        ))?
        .with_filter(Filter::new(VISIBLE_NODES_FILTER, |scene: &mut Scene, _| {
            let Scene {
                nodes,
                dependencies,
                ..
            } = scene;
            dependencies.apply_visible_nodes_filter(&*nodes);
        }))?;
    Ok(group)
}
