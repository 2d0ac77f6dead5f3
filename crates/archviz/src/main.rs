//! Archviz CLI binary.

use anyhow::Result;
use archviz::cli::Cli;
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

/// Main entry point for the archviz CLI.
///
/// Relayouts are spawned as local tasks, so the command runs on a
/// current_thread runtime inside a `LocalSet`.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Can be controlled via RUST_LOG environment variable
    // Example: RUST_LOG=archviz=debug,archviz_filter=trace cargo run -- show -g graph.json
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("archviz=info,archviz_filter=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting archviz CLI");

    let cli = Cli::parse_args();
    LocalSet::new().run_until(cli.execute()).await?;

    tracing::debug!("Archviz CLI completed successfully");
    Ok(())
}
