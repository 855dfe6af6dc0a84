//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use myna_core::{Classification, ProcessingResult, ServiceStatus};

pub fn format_result(result: &ProcessingResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_result(result),
        OutputFormat::Cli => terminal::format_result(result),
    }
}

pub fn format_classification(classification: &Classification, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_classification(classification),
        OutputFormat::Cli => terminal::format_classification(classification),
    }
}

pub fn format_status(status: &ServiceStatus, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_status(status),
        OutputFormat::Cli => terminal::format_status(status),
    }
}
