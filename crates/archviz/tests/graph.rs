//! Integration tests for the graph coordinator.
//!
//! Every test drives a [`Graph`] built from the shop fixture inside a
//! `LocalSet`, since debounced relayouts run as local tasks.

mod common;

use archviz::Error;
use archviz::coalescer::RelayoutState;
use archviz::config::VizConfig;
use archviz::domain::{DependencyKind, DependencyTypeFilter, NodeTypeFilter};
use archviz::graph::Graph;
use archviz::menu::{MenuEvent, ScriptEvent, ViolationMenuEvent};
use common::{MODEL_RULE, RecordingMenu, WEB_RULE, links, shop, unfolded_config, visible};
use rstest::rstest;
use std::time::Duration;
use tokio::task::LocalSet;

fn is_folded(graph: &Graph, full_name: &str) -> bool {
    graph
        .snapshot()
        .node(full_name)
        .unwrap_or_else(|| panic!("{full_name} is not visible"))
        .folded
}

#[tokio::test]
async fn test_initial_state_is_folded_and_rendered_once() {
    LocalSet::new()
        .run_until(async {
            let (graph, frames) = shop(&VizConfig::default());

            assert_eq!(
                visible(&graph),
                vec![
                    "com.shop",
                    "com.shop.web",
                    "com.shop.domain",
                    "com.shop.persistence"
                ]
            );
            assert_eq!(
                links(&graph),
                vec![
                    "com.shop.web -> com.shop.domain",
                    "com.shop.web -> com.shop.persistence",
                    "com.shop.domain -> com.shop.persistence",
                ]
            );

            let frames = frames.borrow();
            assert_eq!(frames.len(), 1);
            assert!(!frames[0].1, "initial relayout has no transition");
            assert_eq!(graph.relayout_state(), RelayoutState::Idle);
        })
        .await;
}

#[tokio::test]
async fn test_cross_group_wiring() {
    LocalSet::new()
        .run_until(async {
            let (graph, _) = shop(&VizConfig::default());
            let filters = graph.filters();

            let order = |key: &str| -> Vec<String> {
                filters
                    .propagation_order(key)
                    .unwrap()
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            };

            assert_eq!(
                order("dependencies.type"),
                vec![
                    "dependencies.type",
                    "nodes.visibleViolations",
                    "nodes.combinedFilter",
                    "dependencies.visibleNodes",
                ]
            );
            assert_eq!(
                order("nodes.name"),
                vec![
                    "nodes.name",
                    "nodes.typeAndName",
                    "nodes.combinedFilter",
                    "dependencies.visibleNodes",
                    "dependencies.nodeTypeAndName",
                    "nodes.visibleViolations",
                    "nodes.combinedFilter",
                    "dependencies.visibleNodes",
                ]
            );
            assert!(filters.validate().is_ok());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_filter_changes_relayouts_once() {
    LocalSet::new()
        .run_until(async {
            let config = VizConfig {
                relayout_delay_ms: 10,
                ..unfolded_config()
            };
            let (mut graph, frames) = shop(&config);

            graph.filter_nodes_by_name("Order").unwrap();
            graph.filter_nodes_by_name("Controller").unwrap();
            graph
                .filter_dependencies_by_type(DependencyTypeFilter::hiding([
                    DependencyKind::Inheritance,
                ]))
                .unwrap();

            // Filter state is current even though nothing was rendered yet
            assert_eq!(graph.relayout_state(), RelayoutState::Scheduled);
            assert_eq!(frames.borrow().len(), 1);
            assert!(visible(&graph).contains(&"com.shop.web.Controller".to_string()));

            graph.wait_for_relayout().await;
            tokio::time::sleep(Duration::from_millis(50)).await;

            let frames = frames.borrow();
            assert_eq!(frames.len(), 2);
            assert!(frames[1].1, "debounced relayout uses a transition");
            assert_eq!(
                frames[1].0.visible_node_names(),
                vec!["com.shop", "com.shop.web", "com.shop.web.Controller"]
            );
        })
        .await;
}

#[tokio::test]
async fn test_hide_nodes_without_violations_round_trip() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&unfolded_config());
            graph.show_violations(WEB_RULE).unwrap();
            let before = graph.snapshot();

            graph.set_hide_nodes_without_violations(true).unwrap();
            assert_eq!(
                visible(&graph),
                vec![
                    "com.shop",
                    "com.shop.web",
                    "com.shop.web.Controller",
                    "com.shop.persistence",
                    "com.shop.persistence.OrderRepository",
                ]
            );
            assert_eq!(
                links(&graph),
                vec!["com.shop.web.Controller -> com.shop.persistence.OrderRepository"]
            );

            graph.set_hide_nodes_without_violations(false).unwrap();
            assert_eq!(graph.snapshot(), before);
        })
        .await;
}

#[tokio::test]
async fn test_hide_dependencies_without_violations() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&unfolded_config());
            graph.show_violations(MODEL_RULE).unwrap();

            graph.set_hide_dependencies_without_violations(true).unwrap();
            let snapshot = graph.snapshot();
            assert_eq!(snapshot.links.len(), 1);
            assert!(snapshot.links[0].violation);
            assert_eq!(snapshot.links[0].origin, "com.shop.domain.model.Item");

            graph.set_hide_dependencies_without_violations(false).unwrap();
            assert_eq!(graph.snapshot().links.len(), 5);
        })
        .await;
}

#[tokio::test]
async fn test_unfold_then_fold_keeps_violation_containers_unfolded() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, frames) = shop(&VizConfig::default());
            graph.show_violations(WEB_RULE).unwrap();
            graph.show_violations(MODEL_RULE).unwrap();
            graph.wait_for_relayout().await;
            let rendered = frames.borrow().len();

            graph.unfold_nodes_to_show_all_violations();
            // Not debounced
            assert_eq!(frames.borrow().len(), rendered + 1);

            let containers = [
                "com.shop.web",
                "com.shop.domain",
                "com.shop.domain.model",
                "com.shop.persistence",
            ];
            for node in containers {
                assert!(!is_folded(&graph, node), "{node} should be unfolded");
            }
            assert!(visible(&graph).contains(&"com.shop.domain.model.Item".to_string()));

            graph.fold_nodes_with_minimum_depth_without_violations();
            assert_eq!(frames.borrow().len(), rendered + 2);
            for node in containers {
                assert!(!is_folded(&graph, node), "{node} should stay unfolded");
            }
        })
        .await;
}

#[tokio::test]
async fn test_fold_nodes_without_violations_folds_outermost_only() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&unfolded_config());
            graph.show_violations(WEB_RULE).unwrap();

            graph.fold_nodes_with_minimum_depth_without_violations();

            assert!(is_folded(&graph, "com.shop.domain"));
            assert!(!is_folded(&graph, "com.shop.web"));
            assert!(!is_folded(&graph, "com.shop.persistence"));
            // Hidden below the folded domain package, so left alone
            assert!(graph.snapshot().node("com.shop.domain.model").is_none());
        })
        .await;
}

#[tokio::test]
async fn test_unknown_violations_group_is_an_error() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&VizConfig::default());

            let err = graph.show_violations("no such rule").unwrap_err();
            assert!(matches!(err, Error::UnknownViolationsGroup(_)));
            assert!(graph.hide_violations("no such rule").is_err());
            assert_eq!(graph.relayout_state(), RelayoutState::Idle);
        })
        .await;
}

#[rstest]
#[case::hide_interfaces(
    MenuEvent::NodeTypeFilterChanged(NodeTypeFilter { show_interfaces: false, show_classes: true }),
    &["com.shop.web.Controller -> com.shop.domain.Order",
      "com.shop.domain.Order -> com.shop.domain.model.Item"],
)]
#[case::hide_field_access(
    MenuEvent::DependencyFilterChanged(DependencyTypeFilter::hiding([DependencyKind::FieldAccess])),
    &["com.shop.web.Controller -> com.shop.web.Api",
      "com.shop.web.Controller -> com.shop.domain.Order",
      "com.shop.domain.Order -> com.shop.domain.model.Item",
      "com.shop.domain.model.Item -> com.shop.persistence.OrderRepository"],
)]
#[case::exclude_controller(
    MenuEvent::NodeNameFilterChanged { filter: "~Controller".to_string() },
    &["com.shop.domain.Order -> com.shop.domain.model.Item",
      "com.shop.domain.model.Item -> com.shop.persistence.OrderRepository"],
)]
#[tokio::test]
async fn test_menu_filters(#[case] event: MenuEvent, #[case] expected: &[&str]) {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&unfolded_config());

            graph.handle_menu_event(event).unwrap();

            assert_eq!(links(&graph), expected);
        })
        .await;
}

#[tokio::test]
async fn test_node_type_filter_hides_emptied_packages() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&unfolded_config());

            graph
                .filter_nodes_by_type(NodeTypeFilter {
                    show_interfaces: false,
                    show_classes: true,
                })
                .unwrap();

            let names = visible(&graph);
            assert!(!names.contains(&"com.shop.persistence".to_string()));
            assert!(!names.contains(&"com.shop.web.Api".to_string()));
            assert!(names.contains(&"com.shop.domain.model.Item".to_string()));
        })
        .await;
}

#[tokio::test]
async fn test_menus_are_initialized_and_mirrored() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, frames) = shop(&unfolded_config());
            let (menu, log) = RecordingMenu::new();
            let (mut violation_menu, violation_log) = RecordingMenu::new();

            graph.attach_to_menu(Box::new(menu));
            graph.attach_to_violation_menu(&mut violation_menu);

            {
                let log = log.borrow();
                assert_eq!(log.styles.map(|styles| styles.node_font_size), Some(10.0));
                assert_eq!(
                    log.dependency_kinds,
                    vec![
                        DependencyKind::Inheritance,
                        DependencyKind::ConstructorCall,
                        DependencyKind::MethodCall,
                        DependencyKind::FieldAccess,
                    ]
                );
            }
            assert_eq!(violation_log.borrow().rules, vec![WEB_RULE, MODEL_RULE]);

            graph.on_node_filter_string_changed("Order").unwrap();
            assert_eq!(log.borrow().name_filters, vec!["Order"]);
            assert_eq!(
                visible(&graph),
                vec![
                    "com.shop",
                    "com.shop.domain",
                    "com.shop.domain.Order",
                    "com.shop.persistence",
                    "com.shop.persistence.OrderRepository",
                ]
            );
            assert!(links(&graph).is_empty());
            assert_eq!(graph.relayout_state(), RelayoutState::Scheduled);

            graph.wait_for_relayout().await;
            let frames = frames.borrow();
            assert_eq!(frames.len(), 2);
            let (last, transition) = frames.last().unwrap();
            assert!(*transition);
            assert_eq!(last.visible_node_names(), visible(&graph));
        })
        .await;
}

#[tokio::test]
async fn test_settings_change_relayouts_immediately() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, frames) = shop(&VizConfig::default());

            graph
                .handle_menu_event(MenuEvent::SettingsChanged {
                    node_font_size: 14.0,
                    circle_padding: 3.0,
                })
                .unwrap();

            let frames = frames.borrow();
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[1].0.node_font_size, 14.0);
            assert_eq!(frames[1].0.circle_padding, 3.0);
            assert_eq!(graph.relayout_state(), RelayoutState::Idle);
        })
        .await;
}

#[tokio::test]
async fn test_replay_script() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, _) = shop(&VizConfig::default());
            let script: Vec<ScriptEvent> = serde_yaml::from_str(&format!(
                r#"
- event: show-violations
  rule: "{WEB_RULE}"
- event: unfold-nodes-to-show-all-violations
- event: hide-nodes-without-violations-changed
  hide: true
"#
            ))
            .unwrap();

            for event in script {
                graph.handle_script_event(event).unwrap();
            }
            graph.wait_for_relayout().await;

            assert_eq!(
                visible(&graph),
                vec![
                    "com.shop",
                    "com.shop.web",
                    "com.shop.web.Controller",
                    "com.shop.persistence",
                    "com.shop.persistence.OrderRepository",
                ]
            );
        })
        .await;
}

#[tokio::test]
async fn test_manual_fold_and_unfold() {
    LocalSet::new()
        .run_until(async {
            let (mut graph, frames) = shop(&unfolded_config());

            assert!(graph.fold("com.shop.domain").unwrap());
            assert!(!graph.fold("com.shop.domain").unwrap());
            assert!(links(&graph).contains(&"com.shop.web.Controller -> com.shop.domain".to_string()));

            assert!(graph.unfold("com.shop.domain").unwrap());
            assert_eq!(frames.borrow().len(), 3);
            assert!(matches!(
                graph.fold("com.shop.nowhere"),
                Err(Error::UnknownNode(_))
            ));

            graph
                .handle_violation_menu_event(ViolationMenuEvent::HideViolations {
                    rule: MODEL_RULE.to_string(),
                })
                .unwrap();
        })
        .await;
}
