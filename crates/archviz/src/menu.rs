//! Menu surfaces and the events they emit.
//!
//! Menus are driven from the outside: a [`Menu`] or [`ViolationMenu`] is
//! initialized by the graph when attached, and user interaction comes back
//! as [`MenuEvent`] / [`ViolationMenuEvent`] values handed to
//! [`crate::graph::Graph`]. Events are serde-tagged so scripts can replay
//! them:
//!
//! ```yaml
//! - event: node-name-filter-changed
//!   filter: "~Test"
//! - event: show-violations
//!   rule: "no cycles"
//! - event: unfold-nodes-to-show-all-violations
//! ```

use crate::domain::{DependencyKind, DependencyTypeFilter, NodeTypeFilter};
use crate::view::VisualizationStyles;
use serde::{Deserialize, Serialize};

/// Settings and filter menu.
pub trait Menu {
    /// Show the initial style settings.
    fn initialize_settings(&mut self, styles: VisualizationStyles);

    /// Offer one checkbox per dependency kind present in the graph.
    fn initialize_dependency_filter(&mut self, kinds: &[DependencyKind]);

    /// The name filter was changed from outside the menu.
    fn change_node_name_filter(&mut self, filter: &str);
}

/// Menu listing the violations groups.
pub trait ViolationMenu {
    /// Offer the given rules for showing and hiding.
    fn initialize(&mut self, rules: &[String]);
}

/// Interaction with the settings and filter menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case"
)]
pub enum MenuEvent {
    /// Font size or circle padding changed.
    SettingsChanged {
        /// New label font size
        node_font_size: f64,
        /// New circle padding
        circle_padding: f64,
    },

    /// Interfaces or classes were toggled.
    NodeTypeFilterChanged(NodeTypeFilter),

    /// Dependency kinds were toggled.
    DependencyFilterChanged(DependencyTypeFilter),

    /// The name filter string was edited.
    NodeNameFilterChanged {
        /// New filter string
        filter: String,
    },
}

/// Interaction with the violations menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case"
)]
pub enum ViolationMenuEvent {
    /// Show a violations group.
    ShowViolations {
        /// Rule of the group
        rule: String,
    },

    /// Hide a violations group.
    HideViolations {
        /// Rule of the group
        rule: String,
    },

    /// Toggle hiding every dependency outside visible violations.
    HideAllDependenciesWithoutViolationsChanged {
        /// Whether to hide
        hide: bool,
    },

    /// Toggle hiding every node outside visible violations.
    HideNodesWithoutViolationsChanged {
        /// Whether to hide
        hide: bool,
    },

    /// Unfold everything needed to see all visible violations.
    UnfoldNodesToShowAllViolations,

    /// Fold everything not involved in visible violations.
    FoldNodesToHideNodesWithoutViolations,
}

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptEvent {
    /// Settings and filter menu event
    Menu(MenuEvent),

    /// Violations menu event
    Violation(ViolationMenuEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let yaml = r#"
- event: settings-changed
  node-font-size: 12.0
  circle-padding: 2.0
- event: node-type-filter-changed
  show-interfaces: false
  show-classes: true
- event: dependency-filter-changed
  hidden: [FIELD_ACCESS]
- event: hide-nodes-without-violations-changed
  hide: true
- event: fold-nodes-to-hide-nodes-without-violations
"#;

        let script: Vec<ScriptEvent> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            script,
            vec![
                ScriptEvent::Menu(MenuEvent::SettingsChanged {
                    node_font_size: 12.0,
                    circle_padding: 2.0,
                }),
                ScriptEvent::Menu(MenuEvent::NodeTypeFilterChanged(NodeTypeFilter {
                    show_interfaces: false,
                    show_classes: true,
                })),
                ScriptEvent::Menu(MenuEvent::DependencyFilterChanged(
                    DependencyTypeFilter::hiding([DependencyKind::FieldAccess])
                )),
                ScriptEvent::Violation(ViolationMenuEvent::HideNodesWithoutViolationsChanged {
                    hide: true
                }),
                ScriptEvent::Violation(ViolationMenuEvent::FoldNodesToHideNodesWithoutViolations),
            ]
        );
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ViolationMenuEvent::ShowViolations {
            rule: "layers".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "event": "show-violations", "rule": "layers" })
        );
    }
}
