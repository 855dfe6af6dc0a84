//! MCP tool definitions and handlers

use crate::protocol::*;
use anyhow::Result;
use myna_core::{Query, QueryContext, RoutingGraph};
use serde_json::Value;

pub fn query_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "query".to_string(),
        description: "Ask an engineering admissions question; it is routed to the admissions \
                      expert or answered with a scope message"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The student's question"
                },
                "user_id": {
                    "type": "string",
                    "description": "Who is asking (default: anonymous)"
                },
                "session_id": {
                    "type": "string",
                    "description": "Session to continue; a new one is created when omitted"
                },
                "context": {
                    "type": "object",
                    "description": "Extra request context, e.g. {\"category\": \"BC\"}"
                }
            },
            "required": ["query"]
        }),
    }
}

pub fn classify_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "classify".to_string(),
        description: "Classify a question as DOMAIN (engineering admissions) or OTHER".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to classify"
                }
            },
            "required": ["query"]
        }),
    }
}

pub fn status_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "status".to_string(),
        description: "Show vector index health and LLM request metrics".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn end_session_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "end_session".to_string(),
        description: "Release the conversation thread held for a session".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session to end"
                }
            },
            "required": ["session_id"]
        }),
    }
}

pub fn all_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        query_tool_definition(),
        classify_tool_definition(),
        status_tool_definition(),
        end_session_tool_definition(),
    ]
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {}", key))
}

fn context_arg(args: &Value) -> Result<QueryContext> {
    match args.get("context") {
        None | Some(Value::Null) => Ok(QueryContext::new()),
        Some(Value::Object(map)) => Ok(map.clone().into_iter().collect()),
        Some(_) => anyhow::bail!("Parameter 'context' must be an object"),
    }
}

pub async fn handle_query(graph: &RoutingGraph, args: Value) -> Result<ToolResult> {
    let text = required_str(&args, "query")?;
    let user_id = args
        .get("user_id")
        .and_then(|v| v.as_str())
        .unwrap_or("anonymous");
    let session_id = args
        .get("session_id")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let query = Query::new(text, user_id)
        .with_session(session_id)
        .with_context(context_arg(&args)?);
    let result = graph.process(query).await;

    let structured = serde_json::to_value(&result)?;
    if result.success {
        Ok(ToolResult::text(result.response, structured))
    } else {
        Ok(ToolResult {
            is_error: Some(true),
            ..ToolResult::text(result.response, structured)
        })
    }
}

pub async fn handle_classify(graph: &RoutingGraph, args: Value) -> Result<ToolResult> {
    let text = required_str(&args, "query")?;
    let classification = graph.classify(text, &QueryContext::new()).await;
    let verdict = classification.verdict();

    let summary = format!(
        "{} ({:.2}, {}): {}",
        verdict.category,
        verdict.confidence,
        classification.source(),
        verdict.rationale
    );
    Ok(ToolResult::text(
        summary,
        serde_json::json!({
            "intent": verdict.category,
            "confidence": verdict.confidence,
            "reasoning": verdict.rationale,
            "source": classification.source(),
        }),
    ))
}

pub async fn handle_status(graph: &RoutingGraph) -> Result<ToolResult> {
    let status = graph.status().await;

    let mut summary = format!("Vector index: {}", status.index.status);
    if let Some(ref stats) = status.index.stats {
        summary.push_str(&format!(" ({} vectors)", stats.total_vector_count));
    }
    if let Some(ref error) = status.index.error {
        summary.push_str(&format!("\nIndex error: {}", error));
    }
    if let Some(ref llm) = status.llm {
        summary.push_str(&format!(
            "\nLLM: {} requests, {} errors, {:.0}ms average",
            llm.total_requests, llm.total_errors, llm.avg_latency_ms
        ));
    }
    summary.push_str(&format!("\nActive threads: {}", status.active_threads));

    Ok(ToolResult::text(summary, serde_json::to_value(&status)?))
}

pub async fn handle_end_session(graph: &RoutingGraph, args: Value) -> Result<ToolResult> {
    let session_id = required_str(&args, "session_id")?;
    let released = graph.end_session(session_id).await?;

    let text = if released {
        format!("Session {} ended; its conversation thread was deleted", session_id)
    } else {
        format!("Session {} had no conversation thread", session_id)
    };
    Ok(ToolResult::text(
        text,
        serde_json::json!({ "session_id": session_id, "released": released }),
    ))
}
