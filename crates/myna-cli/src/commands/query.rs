//! Query command

use crate::app::{OutputFormat, QueryArgs};
use crate::output::format_result;
use anyhow::Result;
use myna_core::{Config, Query, QueryContext, RoutingGraph};

pub async fn run(args: QueryArgs, format: OutputFormat) -> Result<()> {
    let text = super::query_text(&args.query)?;
    let context = parse_context(&args.context)?;

    let config = Config::load()?;
    let graph = RoutingGraph::from_config(&config)?;

    let query = Query::new(text, args.user)
        .with_session(args.session)
        .with_context(context);
    let result = graph.process(query).await;

    // threads do not outlive this process
    graph.shutdown().await;

    print!("{}", format_result(&result, format));
    Ok(())
}

/// Parse `key=value` pairs; values that are valid JSON keep their type
fn parse_context(pairs: &[String]) -> Result<QueryContext> {
    let mut context = QueryContext::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("Invalid context '{}': expected KEY=VALUE", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid context '{}': empty key", pair);
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        context.insert(key.to_string(), value);
    }
    Ok(context)
}
