//! Status command

use crate::app::OutputFormat;
use crate::output::format_status;
use anyhow::Result;
use myna_core::{Config, RoutingGraph};

pub async fn run(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let graph = RoutingGraph::from_config(&config)?;
    let status = graph.status().await;

    print!("{}", format_status(&status, format));
    Ok(())
}
