//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use archviz::config::VizConfig;
use archviz::domain::{
    DependencyKind, GraphDocument, JsonDependency, JsonNode, JsonViolation, JsonViolationsGroup,
    NodeType, ViolationsDocument,
};
use archviz::graph::Graph;
use archviz::menu::{Menu, ViolationMenu};
use archviz::view::{GraphView, LayoutSnapshot, VisualizationStyles};
use std::cell::RefCell;
use std::rc::Rc;

pub const WEB_RULE: &str = "web must not access persistence";
pub const MODEL_RULE: &str = "model must not access persistence";

/// Frames received by a [`RecordingView`], with their transition flag.
pub type Frames = Rc<RefCell<Vec<(LayoutSnapshot, bool)>>>;

/// A view remembering every frame it was asked to render.
pub struct RecordingView {
    frames: Frames,
}

impl RecordingView {
    pub fn new() -> (Self, Frames) {
        let frames = Frames::default();
        (
            Self {
                frames: Rc::clone(&frames),
            },
            frames,
        )
    }
}

impl GraphView for RecordingView {
    fn render(&mut self, snapshot: &LayoutSnapshot, transition: bool) {
        self.frames
            .borrow_mut()
            .push((snapshot.clone(), transition));
    }
}

/// Everything a menu was told.
#[derive(Debug, Default)]
pub struct MenuLog {
    pub styles: Option<VisualizationStyles>,
    pub dependency_kinds: Vec<DependencyKind>,
    pub name_filters: Vec<String>,
    pub rules: Vec<String>,
}

/// A menu writing into a shared [`MenuLog`].
pub struct RecordingMenu {
    log: Rc<RefCell<MenuLog>>,
}

impl RecordingMenu {
    pub fn new() -> (Self, Rc<RefCell<MenuLog>>) {
        let log = Rc::new(RefCell::new(MenuLog::default()));
        (
            Self {
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl Menu for RecordingMenu {
    fn initialize_settings(&mut self, styles: VisualizationStyles) {
        self.log.borrow_mut().styles = Some(styles);
    }

    fn initialize_dependency_filter(&mut self, kinds: &[DependencyKind]) {
        self.log.borrow_mut().dependency_kinds = kinds.to_vec();
    }

    fn change_node_name_filter(&mut self, filter: &str) {
        self.log.borrow_mut().name_filters.push(filter.to_string());
    }
}

impl ViolationMenu for RecordingMenu {
    fn initialize(&mut self, rules: &[String]) {
        self.log.borrow_mut().rules = rules.to_vec();
    }
}

fn node(full_name: &str, node_type: NodeType, children: Vec<JsonNode>) -> JsonNode {
    JsonNode {
        full_name: full_name.to_string(),
        name: full_name.rsplit('.').next().unwrap_or(full_name).to_string(),
        node_type,
        children,
    }
}

fn class(full_name: &str) -> JsonNode {
    node(full_name, NodeType::Class, vec![])
}

fn interface(full_name: &str) -> JsonNode {
    node(full_name, NodeType::Interface, vec![])
}

fn package(full_name: &str, children: Vec<JsonNode>) -> JsonNode {
    node(full_name, NodeType::Package, children)
}

fn dependency(origin: &str, target: &str, kind: DependencyKind) -> JsonDependency {
    JsonDependency {
        origin_class: origin.to_string(),
        target_class: target.to_string(),
        kind,
        description: String::new(),
    }
}

/// ```text
/// com.shop
/// ├── com.shop.web
/// │   ├── Controller (class)
/// │   └── Api (interface)
/// ├── com.shop.domain
/// │   ├── Order (class)
/// │   └── com.shop.domain.model
/// │       └── Item (class)
/// └── com.shop.persistence
///     └── OrderRepository (interface)
/// ```
pub fn shop_graph() -> GraphDocument {
    GraphDocument {
        root: package(
            "com.shop",
            vec![
                package(
                    "com.shop.web",
                    vec![
                        class("com.shop.web.Controller"),
                        interface("com.shop.web.Api"),
                    ],
                ),
                package(
                    "com.shop.domain",
                    vec![
                        class("com.shop.domain.Order"),
                        package("com.shop.domain.model", vec![class("com.shop.domain.model.Item")]),
                    ],
                ),
                package(
                    "com.shop.persistence",
                    vec![interface("com.shop.persistence.OrderRepository")],
                ),
            ],
        ),
        dependencies: vec![
            dependency(
                "com.shop.web.Controller",
                "com.shop.domain.Order",
                DependencyKind::MethodCall,
            ),
            dependency(
                "com.shop.web.Controller",
                "com.shop.persistence.OrderRepository",
                DependencyKind::FieldAccess,
            ),
            dependency(
                "com.shop.domain.Order",
                "com.shop.domain.model.Item",
                DependencyKind::ConstructorCall,
            ),
            dependency(
                "com.shop.web.Controller",
                "com.shop.web.Api",
                DependencyKind::Inheritance,
            ),
            dependency(
                "com.shop.domain.model.Item",
                "com.shop.persistence.OrderRepository",
                DependencyKind::MethodCall,
            ),
        ],
    }
}

pub fn shop_violations() -> ViolationsDocument {
    let violation = |origin: &str, target: &str| JsonViolation {
        origin_class: origin.to_string(),
        target_class: target.to_string(),
    };
    ViolationsDocument {
        groups: vec![
            JsonViolationsGroup {
                rule: WEB_RULE.to_string(),
                violations: vec![violation(
                    "com.shop.web.Controller",
                    "com.shop.persistence.OrderRepository",
                )],
            },
            JsonViolationsGroup {
                rule: MODEL_RULE.to_string(),
                violations: vec![violation(
                    "com.shop.domain.model.Item",
                    "com.shop.persistence.OrderRepository",
                )],
            },
        ],
    }
}

/// Config without the initial fold and without debounce delay.
pub fn unfolded_config() -> VizConfig {
    VizConfig {
        initial_fold: false,
        ..VizConfig::default()
    }
}

/// The shop graph rendered into a [`RecordingView`].
pub fn shop(config: &VizConfig) -> (Graph, Frames) {
    let (view, frames) = RecordingView::new();
    let graph = Graph::new(&shop_graph(), &shop_violations(), Box::new(view), config).unwrap();
    (graph, frames)
}

/// Visible node names of the current snapshot.
pub fn visible(graph: &Graph) -> Vec<String> {
    graph
        .snapshot()
        .nodes
        .into_iter()
        .map(|node| node.full_name)
        .collect()
}

/// Visible links of the current snapshot as `origin -> target`.
pub fn links(graph: &Graph) -> Vec<String> {
    graph
        .snapshot()
        .links
        .into_iter()
        .map(|link| format!("{} -> {}", link.origin, link.target))
        .collect()
}
