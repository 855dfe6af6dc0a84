//! Classify command

use crate::app::{ClassifyArgs, OutputFormat};
use crate::output::format_classification;
use anyhow::Result;
use myna_core::{
    heuristic_verdict, Classification, Config, HttpLLMClient, IntentClassifier, QueryContext,
};
use std::sync::Arc;

pub async fn run(args: ClassifyArgs, format: OutputFormat) -> Result<()> {
    let text = super::query_text(&args.query)?;

    let classification = if args.heuristic {
        Classification::Heuristic {
            verdict: heuristic_verdict(&text),
            parse_error: "model skipped".to_string(),
        }
    } else {
        let config = Config::load()?;
        let client = Arc::new(HttpLLMClient::new(config.llm_service)?);
        IntentClassifier::new(client)
            .classify(&text, &QueryContext::new())
            .await
    };

    print!("{}", format_classification(&classification, format));
    Ok(())
}
