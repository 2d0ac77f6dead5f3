//! Rendering surface.
//!
//! Layout and drawing live outside this crate. A [`GraphView`] receives a
//! [`LayoutSnapshot`] of everything visible whenever the scene relayouts.

use crate::dependencies::DependencySet;
use crate::domain::{DependencyKind, NodeType};
use crate::nodes::NodeTree;
use serde::Serialize;
use tracing::info;

/// A visible node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    /// Fully qualified name
    pub full_name: String,

    /// Simple name
    pub name: String,

    /// Node kind
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Distance from the root
    pub depth: usize,

    /// Whether the node is folded
    pub folded: bool,

    /// Whether the node can be folded at all
    pub has_children: bool,
}

/// A visible link between two visible nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    /// Full name of the origin node
    pub origin: String,

    /// Full name of the target node
    pub target: String,

    /// Kinds of the merged dependencies
    pub kinds: Vec<DependencyKind>,

    /// Number of merged dependencies
    pub count: usize,

    /// Whether a visible violation is part of this link
    pub violation: bool,
}

/// Everything a view needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    /// Visible nodes in preorder
    pub nodes: Vec<NodeView>,

    /// Visible links
    pub links: Vec<LinkView>,

    /// Font size of node labels
    pub node_font_size: f64,

    /// Padding between nested circles
    pub circle_padding: f64,
}

impl LayoutSnapshot {
    pub(crate) fn capture(
        nodes: &NodeTree,
        dependencies: &DependencySet,
        styles: VisualizationStyles,
    ) -> Self {
        let node_views = nodes
            .visible_nodes()
            .into_iter()
            .map(|id| NodeView {
                full_name: nodes.full_name(id).to_string(),
                name: nodes.name(id).to_string(),
                node_type: nodes.node_type(id),
                depth: nodes.depth(id),
                folded: nodes.is_folded(id),
                has_children: !nodes.is_leaf(id),
            })
            .collect();
        let links = dependencies
            .all_dependencies()
            .iter()
            .map(|link| LinkView {
                origin: nodes.full_name(link.origin).to_string(),
                target: nodes.full_name(link.target).to_string(),
                kinds: link.kinds.iter().copied().collect(),
                count: link.count,
                violation: link.contains_violation,
            })
            .collect();

        Self {
            nodes: node_views,
            links,
            node_font_size: styles.node_font_size,
            circle_padding: styles.circle_padding,
        }
    }

    /// Full names of the visible nodes.
    pub fn visible_node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.full_name.as_str()).collect()
    }

    /// Look up a visible node.
    pub fn node(&self, full_name: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.full_name == full_name)
    }
}

/// Styles shared between the menu and the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualizationStyles {
    /// Font size of node labels
    pub node_font_size: f64,

    /// Padding between nested circles
    pub circle_padding: f64,
}

/// Receives layout snapshots.
pub trait GraphView {
    /// Draw `snapshot`, animating from the previous frame if `transition`.
    fn render(&mut self, snapshot: &LayoutSnapshot, transition: bool);
}

/// A view that only logs what it would draw.
#[derive(Debug, Default)]
pub struct TracingView {
    frames: usize,
}

impl TracingView {
    /// Create a view that has not rendered anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl GraphView for TracingView {
    fn render(&mut self, snapshot: &LayoutSnapshot, transition: bool) {
        self.frames += 1;
        info!(
            frame = self.frames,
            nodes = snapshot.nodes.len(),
            links = snapshot.links.len(),
            transition,
            "Rendered layout"
        );
    }
}
