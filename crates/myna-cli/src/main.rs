//! Myna CLI
//!
//! Ask engineering admissions questions from the terminal.

use anyhow::Result;
use clap::Parser;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for answers and the MCP protocol
    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query(args) => commands::query::run(args, cli.format).await,
        Commands::Classify(args) => commands::classify::run(args, cli.format).await,
        Commands::Status => commands::status::run(cli.format).await,
        Commands::Config(args) => commands::config::run(args, cli.format),
        Commands::Logs(args) => commands::logs::run(args, cli.format),
        Commands::Mcp => {
            let config = myna_core::Config::load()?;
            let graph = myna_core::RoutingGraph::from_config(&config)?;
            myna_mcp::start_server(graph).await
        }
    }
}
