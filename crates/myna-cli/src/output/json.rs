//! JSON output formatter

use myna_core::{Classification, ProcessingResult, ServiceStatus};

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_result(result: &ProcessingResult) -> String {
    pretty(result)
}

pub fn format_classification(classification: &Classification) -> String {
    let verdict = classification.verdict();
    pretty(&serde_json::json!({
        "intent": verdict.category,
        "confidence": verdict.confidence,
        "reasoning": verdict.rationale,
        "source": classification.source(),
    }))
}

pub fn format_status(status: &ServiceStatus) -> String {
    pretty(status)
}
