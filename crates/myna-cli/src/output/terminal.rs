//! Terminal output formatter

use myna_core::{Classification, ProcessingResult, ServiceStatus};

pub fn format_result(result: &ProcessingResult) -> String {
    let mut output = format!("{}\n\n", result.response.trim_end());

    let intent = match result.intent {
        Some(ref verdict) => format!("{} {:.2}", verdict.category, verdict.confidence),
        None => "-".to_string(),
    };
    output.push_str(&format!(
        "[{}] intent: {}  session: {}  {:.2}s\n",
        result.handled_by,
        intent,
        result.session_id,
        result.duration.as_secs_f64()
    ));
    if let Some(ref error) = result.error {
        output.push_str(&format!("error: {}\n", error));
    }
    output
}

pub fn format_classification(classification: &Classification) -> String {
    let verdict = classification.verdict();
    format!(
        "Intent:      {}\nConfidence:  {:.2}\nReasoning:   {}\nSource:      {}\n",
        verdict.category,
        verdict.confidence,
        verdict.rationale,
        classification.source()
    )
}

pub fn format_status(status: &ServiceStatus) -> String {
    let mut output = format!("Index:           {}\n", status.index.status);
    if let Some(ref stats) = status.index.stats {
        output.push_str(&format!("  Vectors:       {}\n", stats.total_vector_count));
        if let Some(dimension) = stats.dimension {
            output.push_str(&format!("  Dimension:     {}\n", dimension));
        }
        output.push_str(&format!("  Fullness:      {:.2}\n", stats.index_fullness));
    }
    if let Some(ref error) = status.index.error {
        output.push_str(&format!("  Error:         {}\n", error));
    }

    if let Some(ref llm) = status.llm {
        output.push('\n');
        output.push_str("LLM:\n");
        output.push_str(&format!("  Requests:      {}\n", llm.total_requests));
        output.push_str(&format!("  Errors:        {}\n", llm.total_errors));
        output.push_str(&format!("  Avg latency:   {:.0}ms\n", llm.avg_latency_ms));
    }

    output.push_str(&format!("\nActive threads:  {}\n", status.active_threads));
    output
}
