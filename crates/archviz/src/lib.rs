//! Archviz - interactive architecture dependency graphs.
//!
//! A graph of packages, classes and interfaces is filtered, folded and
//! relaid out in response to menu events. Filters live in two groups, owned
//! by the [`nodes::NodeTree`] and the [`dependencies::DependencySet`], and
//! are recomputed through an [`archviz_filter::FilterCollection`] whenever a
//! menu changes one of their preconditions. The [`graph::Graph`] coordinator
//! wires everything together and debounces the resulting relayouts.

#![forbid(unsafe_code)]

pub mod coalescer;
pub mod config;
pub mod dependencies;
pub mod domain;
pub mod error;
pub mod graph;
pub mod menu;
pub mod nodes;
pub mod output;
pub mod scene;
pub mod view;

// Public CLI module (needed by binary)
pub mod cli;

pub use error::{Error, Result};
