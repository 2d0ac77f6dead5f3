//! Output formatting for CLI commands.
//!
//! Snapshots are printed either as an indented, colored tree followed by the
//! visible links, or as JSON for programmatic use.

use crate::domain::NodeType;
use crate::view::{LayoutSnapshot, LinkView, NodeView};
use colored::Colorize;
use std::io::{self, Write};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Print a layout snapshot to stdout in the specified format
pub fn print_snapshot(snapshot: &LayoutSnapshot, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_snapshot(&mut handle, snapshot, mode)
}

/// Write a layout snapshot in the specified format
pub fn write_snapshot(
    w: &mut impl Write,
    snapshot: &LayoutSnapshot,
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Text => write_snapshot_text(w, snapshot),
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, snapshot)?;
            writeln!(w)
        }
    }
}

fn write_snapshot_text(w: &mut impl Write, snapshot: &LayoutSnapshot) -> io::Result<()> {
    for node in &snapshot.nodes {
        writeln!(w, "{}", format_node(node))?;
    }

    if snapshot.links.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{}", "Dependencies:".bold())?;
    for link in &snapshot.links {
        writeln!(w, "  {}", format_link(link))?;
    }
    Ok(())
}

fn format_node(node: &NodeView) -> String {
    let indent = "  ".repeat(node.depth);
    let marker = match (node.has_children, node.folded) {
        (false, _) => " ",
        (true, true) => "+",
        (true, false) => "-",
    };
    let name = match node.node_type {
        NodeType::Package => node.name.blue().bold().to_string(),
        NodeType::Interface => node.name.green().italic().to_string(),
        NodeType::Class => node.name.normal().to_string(),
    };
    format!("{indent}{marker} {name}")
}

fn format_link(link: &LinkView) -> String {
    let kinds = link
        .kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let arrow = format!("{} -> {}", link.origin, link.target);
    let arrow = if link.violation {
        arrow.red().to_string()
    } else {
        arrow
    };
    let count = if link.count > 1 {
        format!(" x{}", link.count)
    } else {
        String::new()
    };
    format!("{arrow} [{}]{}", kinds.dimmed(), count)
}
