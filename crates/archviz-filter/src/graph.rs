//! Dependent-key graph operations.
//!
//! An edge `A -> B` means "after recomputing A, B must be recomputed too".
//! This module provides:
//! - Depth-first propagation order for a single triggered key
//! - Whole-graph validation (unknown targets, cycles) using petgraph

use crate::collection::FilterCollection;
use crate::error::{Error, Result};
use crate::key::FilterKey;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// One level of the explicit depth-first work-list.
struct Frame {
    key: FilterKey,
    remaining: std::vec::IntoIter<FilterKey>,
}

/// Compute the order in which filters are recomputed when `root` changes.
///
/// The order is a depth-first preorder following dependent keys in
/// declaration order. A key reachable along several paths appears once per
/// path: a filter downstream of two changed filters must be recomputed after
/// each of them.
///
/// Cycles are detected on the current path, so a cyclic declaration fails
/// here instead of recursing forever.
pub(crate) fn propagation_order<C>(
    collection: &FilterCollection<C>,
    root: &FilterKey,
) -> Result<Vec<FilterKey>> {
    let filter = collection
        .lookup(root)
        .ok_or_else(|| Error::FilterNotFound {
            key: root.to_string(),
        })?;

    let mut order = vec![root.clone()];
    let mut on_path: HashSet<FilterKey> = HashSet::from([root.clone()]);
    let mut stack = vec![Frame {
        key: root.clone(),
        remaining: filter.dependent_keys().into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(next) = frame.remaining.next() else {
            if let Some(done) = stack.pop() {
                on_path.remove(&done.key);
            }
            continue;
        };

        if on_path.contains(&next) {
            return Err(cycle_error(&stack, &next));
        }

        let dependent = collection
            .lookup(&next)
            .ok_or_else(|| Error::DependentKeyNotFound {
                from: frame.key.to_string(),
                to: next.to_string(),
            })?;

        order.push(next.clone());
        on_path.insert(next.clone());
        stack.push(Frame {
            remaining: dependent.dependent_keys().into_iter(),
            key: next,
        });
    }

    Ok(order)
}

/// Build the cycle report from the current path and the key closing it.
fn cycle_error(stack: &[Frame], closing: &FilterKey) -> Error {
    let start = stack
        .iter()
        .position(|frame| &frame.key == closing)
        .unwrap_or(0);
    let mut path: Vec<String> = stack[start..]
        .iter()
        .map(|frame| frame.key.to_string())
        .collect();
    path.push(closing.to_string());
    Error::CyclicDependency { path }
}

/// Validate the complete dependent-key graph.
///
/// Every declared dependent key must name a registered filter, and the
/// graph must be acyclic.
pub(crate) fn validate_dependency_graph<C>(collection: &FilterCollection<C>) -> Result<()> {
    let mut graph: DiGraph<FilterKey, ()> = DiGraph::new();
    let mut node_map: HashMap<FilterKey, NodeIndex> = HashMap::new();

    for key in collection.keys() {
        let node = graph.add_node(key.clone());
        node_map.insert(key.clone(), node);
    }

    for (key, filter) in collection.iter() {
        let from = node_map[key];
        for dependent in filter.dependent_keys() {
            let to = node_map
                .get(&dependent)
                .ok_or_else(|| Error::DependentKeyNotFound {
                    from: key.to_string(),
                    to: dependent.to_string(),
                })?;
            graph.update_edge(from, *to, ());
        }
    }

    if let Err(cycle) = algo::toposort(&graph, None) {
        // Re-walk from a key on the cycle to report the keys forming it
        let key = graph[cycle.node_id()].clone();
        return Err(match propagation_order(collection, &key) {
            Err(err) => err,
            Ok(_) => Error::CyclicDependency {
                path: vec![key.to_string(), key.to_string()],
            },
        });
    }

    Ok(())
}
