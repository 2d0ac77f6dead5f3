//! The graph coordinator.
//!
//! [`Graph`] owns the [`Scene`], the filter collection built from the node
//! tree's and dependency set's filter groups, and the relayout coalescer.
//! Every filter-driven operation follows the same pattern: change one
//! precondition, recompute one filter key and everything depending on it,
//! then arm a debounced relayout.
//!
//! Cross-group filter wiring:
//!
//! ```text
//! nodes.typeAndName            -> dependencies.nodeTypeAndName
//! nodes.combinedFilter         -> dependencies.visibleNodes
//! dependencies.type            -> nodes.visibleViolations
//! dependencies.nodeTypeAndName -> nodes.visibleViolations
//! dependencies.violations      -> nodes.visibleViolations
//! ```
//!
//! Relayouts run as local tasks, so a `Graph` must be driven from inside a
//! [`tokio::task::LocalSet`].

use crate::coalescer::{RelayoutCoalescer, RelayoutState};
use crate::config::VizConfig;
use crate::dependencies::{self, DEPENDENCIES_GROUP, DependencySet};
use crate::domain::{DependencyTypeFilter, GraphDocument, NodeTypeFilter, ViolationsDocument};
use crate::error::Result;
use crate::menu::{Menu, MenuEvent, ScriptEvent, ViolationMenu, ViolationMenuEvent};
use crate::nodes::{self, NODES_GROUP, NodeId, NodeTree};
use crate::scene::Scene;
use crate::view::{GraphView, LayoutSnapshot, VisualizationStyles};
use archviz_filter::FilterCollection;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

fn key(group: &str, filter: &str) -> String {
    format!("{group}.{filter}")
}

/// Coordinates filters, folding and relayouts of one graph.
pub struct Graph {
    scene: Rc<RefCell<Scene>>,
    filters: FilterCollection<Scene>,
    coalescer: RelayoutCoalescer,
    rules: Vec<String>,
    menu: Option<Box<dyn Menu>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("filters", &self.filters)
            .field("coalescer", &self.coalescer)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Build the graph and render its initial state.
    ///
    /// Startup order: build both components, fold every node if configured,
    /// recreate the visible dependencies, relayout completely, then build
    /// the filter collection, wire it and validate the wiring.
    ///
    /// # Errors
    ///
    /// Returns an error if the documents are inconsistent or the filter
    /// wiring is invalid.
    pub fn new(
        graph: &GraphDocument,
        violations: &ViolationsDocument,
        view: Box<dyn GraphView>,
        config: &VizConfig,
    ) -> Result<Self> {
        let mut nodes = NodeTree::from_document(&graph.root)?;
        let mut dependencies = DependencySet::new(&graph.dependencies, violations, &nodes)?;

        if config.initial_fold {
            nodes.fold_all_nodes(&mut dependencies);
        }
        let styles = VisualizationStyles {
            node_font_size: config.node_font_size,
            circle_padding: config.circle_padding,
        };
        let node_group = Rc::clone(nodes.filter_group());
        let dependency_group = Rc::clone(dependencies.filter_group());
        let rules = dependencies
            .violations_groups()
            .iter()
            .map(|group| group.rule().to_string())
            .collect();

        let mut scene = Scene::new(nodes, dependencies, styles, view);
        scene.recreate_visible_dependencies();
        scene.relayout_completely();

        let filters = FilterCollection::builder()
            .add_filter_group(Rc::clone(&node_group))
            .add_filter_group(Rc::clone(&dependency_group))
            .build()?;

        node_group
            .get_filter(nodes::TYPE_AND_NAME_FILTER)?
            .add_dependent_filter_key(&key(DEPENDENCIES_GROUP, dependencies::NODE_TYPE_AND_NAME_FILTER))?;
        node_group
            .get_filter(nodes::COMBINED_FILTER)?
            .add_dependent_filter_key(&key(DEPENDENCIES_GROUP, dependencies::VISIBLE_NODES_FILTER))?;
        let visible_violations = key(NODES_GROUP, nodes::VISIBLE_VIOLATIONS_FILTER);
        for filter in [
            dependencies::TYPE_FILTER,
            dependencies::NODE_TYPE_AND_NAME_FILTER,
            dependencies::VIOLATIONS_FILTER,
        ] {
            dependency_group
                .get_filter(filter)?
                .add_dependent_filter_key(&visible_violations)?;
        }
        filters.validate()?;

        info!(
            nodes = scene.nodes().len(),
            dependencies = scene.dependencies().dependencies().len(),
            "Graph ready"
        );

        Ok(Self {
            scene: Rc::new(RefCell::new(scene)),
            filters,
            coalescer: RelayoutCoalescer::new(config.relayout_delay()),
            rules,
            menu: None,
        })
    }

    /// The filter collection.
    pub fn filters(&self) -> &FilterCollection<Scene> {
        &self.filters
    }

    /// The current layout.
    pub fn snapshot(&self) -> LayoutSnapshot {
        self.scene.borrow().snapshot()
    }

    /// Number of relayouts performed so far.
    pub fn relayouts(&self) -> usize {
        self.scene.borrow().relayouts()
    }

    /// Whether a debounced relayout is pending.
    pub fn relayout_state(&self) -> RelayoutState {
        self.coalescer.state()
    }

    /// Wait for the pending debounced relayout, if any.
    pub async fn wait_for_relayout(&mut self) {
        self.coalescer.flush().await;
    }

    /// Resolve a node by full name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownNode`] if no node has this name.
    pub fn node(&self, full_name: &str) -> Result<NodeId> {
        self.scene.borrow().nodes().require(full_name)
    }

    /// Fold a node and relayout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownNode`] if no node has this name.
    pub fn fold(&mut self, full_name: &str) -> Result<bool> {
        self.set_folded(full_name, true)
    }

    /// Unfold a node and relayout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownNode`] if no node has this name.
    pub fn unfold(&mut self, full_name: &str) -> Result<bool> {
        self.set_folded(full_name, false)
    }

    fn set_folded(&mut self, full_name: &str, folded: bool) -> Result<bool> {
        let mut scene = self.scene.borrow_mut();
        let id = scene.nodes().require(full_name)?;
        let Scene {
            nodes,
            dependencies,
            ..
        } = &mut *scene;
        let changed = if folded {
            nodes.fold(id, dependencies)
        } else {
            nodes.unfold(id, dependencies)
        };
        if changed {
            scene.recreate_visible_dependencies();
            scene.relayout_completely();
        }
        Ok(changed)
    }

    // ========== Filter operations ==========

    /// Recompute `key` and its dependents, then arm a debounced relayout.
    fn update_filter_and_relayout(&mut self, key: &str) -> Result<()> {
        {
            let filters = &self.filters;
            let mut scene = self.scene.borrow_mut();
            scene.schedule_action(|scene| filters.update_filter(key, scene))?;
        }
        self.arm_requested_relayout();
        Ok(())
    }

    /// Arm a debounced relayout if a scene action asked for one.
    fn arm_requested_relayout(&mut self) {
        if !self.scene.borrow().is_relayout_requested() {
            return;
        }
        let scene = Rc::downgrade(&self.scene);
        self.coalescer.schedule_relayout(move || {
            let Some(scene) = scene.upgrade() else {
                return;
            };
            match scene.try_borrow_mut() {
                Ok(mut scene) => scene.enforce_complete_relayout(),
                Err(_) => warn!("Scene busy, skipping debounced relayout"),
            };
        });
    }

    /// Show only nodes matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cascade fails.
    pub fn filter_nodes_by_name(&mut self, filter: &str) -> Result<()> {
        self.scene.borrow_mut().nodes.set_name_filter_string(filter);
        self.update_filter_and_relayout(&key(NODES_GROUP, nodes::NAME_FILTER))
    }

    /// Show or hide interfaces and classes.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cascade fails.
    pub fn filter_nodes_by_type(&mut self, filter: NodeTypeFilter) -> Result<()> {
        self.scene
            .borrow_mut()
            .nodes
            .change_type_filter(filter.show_interfaces, filter.show_classes);
        self.update_filter_and_relayout(&key(NODES_GROUP, nodes::TYPE_FILTER))
    }

    /// Hide dependencies of the given kinds.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cascade fails.
    pub fn filter_dependencies_by_type(&mut self, filter: DependencyTypeFilter) -> Result<()> {
        self.scene
            .borrow_mut()
            .dependencies
            .change_type_filter(filter);
        self.update_filter_and_relayout(&key(DEPENDENCIES_GROUP, dependencies::TYPE_FILTER))
    }

    /// Toggle hiding nodes not involved in any visible violation.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cascade fails.
    pub fn set_hide_nodes_without_violations(&mut self, hide: bool) -> Result<()> {
        let key = key(NODES_GROUP, nodes::VISIBLE_VIOLATIONS_FILTER);
        self.filters.get_filter(&key)?.set_enabled(hide);
        self.update_filter_and_relayout(&key)
    }

    /// Toggle hiding dependencies outside visible violations.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cascade fails.
    pub fn set_hide_dependencies_without_violations(&mut self, hide: bool) -> Result<()> {
        let key = key(DEPENDENCIES_GROUP, dependencies::VIOLATIONS_FILTER);
        self.filters.get_filter(&key)?.set_enabled(hide);
        self.update_filter_and_relayout(&key)
    }

    /// Show the violations of `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownViolationsGroup`] for an unknown rule.
    pub fn show_violations(&mut self, rule: &str) -> Result<()> {
        self.scene.borrow_mut().dependencies.show_violations(rule)?;
        self.update_filter_and_relayout(&key(DEPENDENCIES_GROUP, dependencies::VIOLATIONS_FILTER))
    }

    /// Hide the violations of `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownViolationsGroup`] for an unknown rule.
    pub fn hide_violations(&mut self, rule: &str) -> Result<()> {
        self.scene.borrow_mut().dependencies.hide_violations(rule)?;
        self.update_filter_and_relayout(&key(DEPENDENCIES_GROUP, dependencies::VIOLATIONS_FILTER))
    }

    /// The name filter was edited on the node tree itself: mirror it into
    /// the menu, recompute the name filter and arm a debounced relayout.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cascade fails.
    pub fn on_node_filter_string_changed(&mut self, filter: &str) -> Result<()> {
        if let Some(menu) = self.menu.as_mut() {
            menu.change_node_name_filter(filter);
        }
        let filters = &self.filters;
        let key = key(NODES_GROUP, nodes::NAME_FILTER);
        self.scene.borrow_mut().schedule_action(|scene| {
            scene.nodes.set_name_filter_string(filter);
            filters.update_filter(&key, scene)
        })?;
        self.arm_requested_relayout();
        Ok(())
    }

    // ========== Fold operations ==========

    /// Unfold every node containing a visible violation, and its ancestors.
    /// Relayouts immediately.
    pub fn unfold_nodes_to_show_all_violations(&mut self) {
        let mut scene = self.scene.borrow_mut();
        let Scene {
            nodes,
            dependencies,
            ..
        } = &mut *scene;
        let mut containing: Vec<NodeId> = dependencies
            .nodes_containing_violations(&*nodes)
            .into_iter()
            .collect();
        containing.sort_unstable();
        debug!(nodes = containing.len(), "Unfolding nodes containing violations");

        for node in containing {
            nodes.call_on_every_predecessor_then_self(node, |tree, id| {
                tree.unfold(id, &mut *dependencies);
            });
        }
        scene.recreate_visible_dependencies();
        scene.relayout_completely();
    }

    /// Fold the outermost nodes not involved in any visible violation.
    /// Relayouts immediately.
    pub fn fold_nodes_with_minimum_depth_without_violations(&mut self) {
        let mut scene = self.scene.borrow_mut();
        let Scene {
            nodes,
            dependencies,
            ..
        } = &mut *scene;
        let involved = dependencies.nodes_involved_in_visible_violations();
        nodes.fold_nodes_with_minimum_depth_that_have_not_descendants(&involved, dependencies);
        scene.recreate_visible_dependencies();
        scene.relayout_completely();
    }

    // ========== Menus ==========

    /// Change label font size and circle padding. Relayouts immediately.
    pub fn change_settings(&mut self, node_font_size: f64, circle_padding: f64) {
        let mut scene = self.scene.borrow_mut();
        scene.set_styles(VisualizationStyles {
            node_font_size,
            circle_padding,
        });
        scene.relayout_completely();
    }

    /// Attach the settings and filter menu.
    pub fn attach_to_menu(&mut self, mut menu: Box<dyn Menu>) {
        {
            let scene = self.scene.borrow();
            menu.initialize_settings(scene.styles());
            menu.initialize_dependency_filter(&scene.dependencies().dependency_types());
        }
        self.menu = Some(menu);
    }

    /// Attach the violations menu.
    pub fn attach_to_violation_menu(&self, menu: &mut dyn ViolationMenu) {
        menu.initialize(&self.rules);
    }

    /// Dispatch an event from the settings and filter menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the triggered filter cascade fails.
    pub fn handle_menu_event(&mut self, event: MenuEvent) -> Result<()> {
        debug!(?event, "Menu event");
        match event {
            MenuEvent::SettingsChanged {
                node_font_size,
                circle_padding,
            } => {
                self.change_settings(node_font_size, circle_padding);
                Ok(())
            }
            MenuEvent::NodeTypeFilterChanged(filter) => self.filter_nodes_by_type(filter),
            MenuEvent::DependencyFilterChanged(filter) => self.filter_dependencies_by_type(filter),
            MenuEvent::NodeNameFilterChanged { filter } => self.filter_nodes_by_name(&filter),
        }
    }

    /// Dispatch an event from the violations menu.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown violations group or if the triggered
    /// filter cascade fails.
    pub fn handle_violation_menu_event(&mut self, event: ViolationMenuEvent) -> Result<()> {
        debug!(?event, "Violation menu event");
        match event {
            ViolationMenuEvent::ShowViolations { rule } => self.show_violations(&rule),
            ViolationMenuEvent::HideViolations { rule } => self.hide_violations(&rule),
            ViolationMenuEvent::HideAllDependenciesWithoutViolationsChanged { hide } => {
                self.set_hide_dependencies_without_violations(hide)
            }
            ViolationMenuEvent::HideNodesWithoutViolationsChanged { hide } => {
                self.set_hide_nodes_without_violations(hide)
            }
            ViolationMenuEvent::UnfoldNodesToShowAllViolations => {
                self.unfold_nodes_to_show_all_violations();
                Ok(())
            }
            ViolationMenuEvent::FoldNodesToHideNodesWithoutViolations => {
                self.fold_nodes_with_minimum_depth_without_violations();
                Ok(())
            }
        }
    }

    /// Dispatch a scripted event to the matching menu handler.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub fn handle_script_event(&mut self, event: ScriptEvent) -> Result<()> {
        match event {
            ScriptEvent::Menu(event) => self.handle_menu_event(event),
            ScriptEvent::Violation(event) => self.handle_violation_menu_event(event),
        }
    }
}
