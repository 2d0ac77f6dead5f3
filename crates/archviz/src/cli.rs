//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `show`: Load a graph, replay menu events, print what ends up visible
//!
//! # Example
//!
//! ```bash
//! archviz show --graph graph.json --violations violations.json --script steps.yaml
//! archviz --json show --graph graph.json
//! ```

use crate::config::VizConfig;
use crate::domain::{DependencyKind, GraphDocument, ViolationsDocument};
use crate::graph::Graph;
use crate::menu::{Menu, ScriptEvent, ViolationMenu};
use crate::output::{self, OutputMode};
use crate::view::{TracingView, VisualizationStyles};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Archviz - filter and fold architecture dependency graphs
///
/// Loads a graph of packages, classes and their dependencies together with
/// the architecture violations found in it, and prints the visible part.
#[derive(Parser, Debug)]
#[command(name = "archviz")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the visible graph
    ///
    /// Builds the graph, replays the optional script of menu events and
    /// prints the visible nodes and dependencies after the last relayout.
    Show(ShowArgs),
}

/// Arguments for the `show` command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Graph document (JSON)
    #[arg(short, long)]
    pub graph: PathBuf,

    /// Violations document (JSON)
    #[arg(short, long)]
    pub violations: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Menu events to replay (YAML or JSON list)
    #[arg(short, long)]
    pub script: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command.
    ///
    /// Must run inside a [`tokio::task::LocalSet`].
    pub async fn execute(&self) -> Result<()> {
        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Commands::Show(args) => execute_show(args, output_mode).await,
        }
    }
}

async fn execute_show(args: &ShowArgs, output_mode: OutputMode) -> Result<()> {
    let graph_document = GraphDocument::load(&args.graph)
        .await
        .with_context(|| format!("Failed to load graph from {}", args.graph.display()))?;
    let violations = match &args.violations {
        Some(path) => ViolationsDocument::load(path)
            .await
            .with_context(|| format!("Failed to load violations from {}", path.display()))?,
        None => ViolationsDocument::default(),
    };
    let config = match &args.config {
        Some(path) => VizConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => VizConfig::default(),
    };

    let mut graph = Graph::new(
        &graph_document,
        &violations,
        Box::new(TracingView::new()),
        &config,
    )?;
    graph.attach_to_menu(Box::new(LoggingMenu));
    graph.attach_to_violation_menu(&mut LoggingMenu);

    if let Some(path) = &args.script {
        let events = load_script(path).await?;
        info!(events = events.len(), "Replaying script");
        for event in events {
            graph.handle_script_event(event)?;
        }
    }
    graph.wait_for_relayout().await;

    output::print_snapshot(&graph.snapshot(), output_mode)?;
    Ok(())
}

async fn load_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse script {}", path.display()))
}

/// Menu that only logs what it is told.
struct LoggingMenu;

impl Menu for LoggingMenu {
    fn initialize_settings(&mut self, styles: VisualizationStyles) {
        debug!(
            node_font_size = styles.node_font_size,
            circle_padding = styles.circle_padding,
            "Menu settings initialized"
        );
    }

    fn initialize_dependency_filter(&mut self, kinds: &[DependencyKind]) {
        debug!(?kinds, "Menu dependency filter initialized");
    }

    fn change_node_name_filter(&mut self, filter: &str) {
        debug!(filter, "Menu name filter changed");
    }
}

impl ViolationMenu for LoggingMenu {
    fn initialize(&mut self, rules: &[String]) {
        debug!(?rules, "Violation menu initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show() {
        let cli = Cli::try_parse_from([
            "archviz",
            "--json",
            "show",
            "--graph",
            "graph.json",
            "--script",
            "steps.yaml",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Show(args) = cli.command;
        assert_eq!(args.graph, PathBuf::from("graph.json"));
        assert_eq!(args.script, Some(PathBuf::from("steps.yaml")));
        assert!(args.violations.is_none());
    }

    #[test]
    fn test_show_requires_graph() {
        assert!(Cli::try_parse_from(["archviz", "show"]).is_err());
    }
}
