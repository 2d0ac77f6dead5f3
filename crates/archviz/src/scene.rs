//! The mutable visualization state all filters recompute.
//!
//! A [`Scene`] bundles the node tree, the dependency set, the styles and the
//! view. Filter evaluators receive `&mut Scene` and reach into whichever
//! component they recompute; a filter that needs both destructures the scene
//! to borrow them separately.

use crate::dependencies::DependencySet;
use crate::nodes::NodeTree;
use crate::view::{GraphView, LayoutSnapshot, VisualizationStyles};
use std::fmt;
use tracing::debug;

/// Node tree, dependency set, styles and view.
pub struct Scene {
    pub(crate) nodes: NodeTree,
    pub(crate) dependencies: DependencySet,
    styles: VisualizationStyles,
    view: Box<dyn GraphView>,
    relayout_requested: bool,
    relayouts: usize,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes)
            .field("dependencies", &self.dependencies)
            .field("styles", &self.styles)
            .field("relayout_requested", &self.relayout_requested)
            .field("relayouts", &self.relayouts)
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Assemble a scene. Nothing is rendered yet.
    pub fn new(
        nodes: NodeTree,
        dependencies: DependencySet,
        styles: VisualizationStyles,
        view: Box<dyn GraphView>,
    ) -> Self {
        Self {
            nodes,
            dependencies,
            styles,
            view,
            relayout_requested: false,
            relayouts: 0,
        }
    }

    /// The node tree.
    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    /// The dependency set.
    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    /// Current styles.
    pub fn styles(&self) -> VisualizationStyles {
        self.styles
    }

    /// Replace the styles. Takes effect on the next relayout.
    pub fn set_styles(&mut self, styles: VisualizationStyles) {
        self.styles = styles;
    }

    /// Run `action` against the scene, then mark a relayout as requested.
    ///
    /// A failed action leaves the request flag untouched.
    pub fn schedule_action<T, E>(
        &mut self,
        action: impl FnOnce(&mut Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let value = action(self)?;
        self.relayout_requested = true;
        Ok(value)
    }

    /// Whether an action succeeded since the last relayout.
    pub fn is_relayout_requested(&self) -> bool {
        self.relayout_requested
    }

    /// Number of relayouts performed so far.
    pub fn relayouts(&self) -> usize {
        self.relayouts
    }

    /// Rebuild the visible dependency links.
    pub fn recreate_visible_dependencies(&mut self) {
        self.dependencies.recreate_visible(&self.nodes);
    }

    /// Render the current state without a transition.
    pub fn relayout_completely(&mut self) {
        self.render(false);
    }

    /// Render the current state, animating from the previous frame.
    pub fn enforce_complete_relayout(&mut self) {
        self.render(true);
    }

    /// The current layout as the view would receive it.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot::capture(&self.nodes, &self.dependencies, self.styles)
    }

    fn render(&mut self, transition: bool) {
        if self.dependencies.is_stale() {
            self.recreate_visible_dependencies();
        }
        let snapshot = self.snapshot();
        self.view.render(&snapshot, transition);
        self.relayout_requested = false;
        self.relayouts += 1;
        debug!(
            relayouts = self.relayouts,
            transition,
            nodes = snapshot.nodes.len(),
            "Relayout"
        );
    }
}
