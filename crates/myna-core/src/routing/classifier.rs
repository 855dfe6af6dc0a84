//! LLM-backed intent classification with a keyword heuristic fallback

use super::{Classification, IntentCategory, IntentVerdict, QueryContext};
use crate::error::{MynaError, Result};
use crate::llm::{ChatMessage, LLMClient};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

const CLASSIFIER_PROMPT: &str = r#"You are the router for an engineering admissions counselling service.
Decide which handler should answer the user's query.

Classify as "DOMAIN" when the query is about:
- Engineering colleges or branches (Computer Science, IT, ECE, Mechanical, Civil, etc.)
- Admission to engineering programmes, counselling rounds, or seat allotment
- Cutoff marks or scores for engineering admission
- Which colleges a student can get with their marks or rank

Classify as "OTHER" for:
- Medical admissions (NEET, MBBS, medical colleges)
- Arts, commerce, or other non-engineering courses
- General career guidance with no engineering admissions focus

If the user mentions their marks or score and asks about getting a seat or a college,
it is an engineering admission question unless they say otherwise.

Output ONLY this JSON (no markdown, no explanation):
{
  "intent": "DOMAIN" | "OTHER",
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation"
}"#;

const DOMAIN_KEYWORDS: &[&str] = &[
    "engineering",
    "computer science",
    "cs",
    "cse",
    "information technology",
    "ece",
    "eee",
    "electronics",
    "electrical",
    "mechanical",
    "civil",
    "chemical",
    "biotechnology",
    "aeronautical",
    "cutoff",
    "cut-off",
    "cut off",
    "mark",
    "marks",
    "score",
    "admission",
    "seat",
    "seats",
    "college",
    "colleges",
    "tnea",
    "anna university",
    "counselling",
    "counseling",
];

const MEDICAL_KEYWORDS: &[&str] = &["medical", "neet", "mbbs", "doctor", "medicine"];

const SCORE_STEMS: &[&str] = &["mark", "score", "point"];
const PLACEMENT_STEMS: &[&str] = &["college", "admission", "seat", "get"];

/// Case-insensitive whole-word alternation over `words`
pub(crate) fn word_regex(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("keyword pattern is valid")
}

lazy_static! {
    static ref DOMAIN_TERMS: Regex = word_regex(DOMAIN_KEYWORDS);
    static ref MEDICAL_TERMS: Regex = word_regex(MEDICAL_KEYWORDS);
}

/// Keyword-only verdict, used when model output cannot be parsed
pub fn heuristic_verdict(query: &str) -> IntentVerdict {
    let has_domain = DOMAIN_TERMS.is_match(query);
    let has_medical = MEDICAL_TERMS.is_match(query);

    if has_medical && !has_domain {
        return IntentVerdict::new(IntentCategory::Other, 0.8, "Detected medical keywords");
    }
    if has_domain {
        return IntentVerdict::new(
            IntentCategory::Domain,
            0.8,
            "Detected engineering/admission keywords",
        );
    }

    let lower = query.to_lowercase();
    let mentions_score = SCORE_STEMS.iter().any(|s| lower.contains(s));
    let mentions_placement = PLACEMENT_STEMS.iter().any(|s| lower.contains(s));
    if mentions_score && mentions_placement {
        return IntentVerdict::new(
            IntentCategory::Domain,
            0.7,
            "Mentions marks and a college or seat - likely an engineering admission question",
        );
    }

    IntentVerdict::new(
        IntentCategory::Other,
        0.5,
        "No clear engineering admission indicators",
    )
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse model output into a verdict
pub fn parse_verdict(response: &str) -> Result<IntentVerdict> {
    // Handle markdown code blocks
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
    } else {
        response
    }
    .trim();

    let raw: RawVerdict = serde_json::from_str(json_str)
        .map_err(|e| MynaError::Llm(format!("Invalid intent JSON: {}", e)))?;

    let category = IntentCategory::from_label(&raw.intent)
        .ok_or_else(|| MynaError::Llm(format!("Unknown intent label: {}", raw.intent)))?;

    Ok(IntentVerdict::new(
        category,
        raw.confidence.unwrap_or(0.0),
        raw.reasoning.unwrap_or_default(),
    ))
}

/// Classifies queries as DOMAIN or OTHER
pub struct IntentClassifier {
    client: Arc<dyn LLMClient>,
}

impl IntentClassifier {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Classify a query. Never fails: unparseable output goes through the
    /// keyword heuristic and an unreachable model yields a degraded verdict.
    pub async fn classify(&self, query: &str, context: &QueryContext) -> Classification {
        let messages = vec![
            ChatMessage::system(CLASSIFIER_PROMPT),
            ChatMessage::user(build_user_message(query, context)),
        ];

        let response = match self.client.chat_completion(messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Intent classification unavailable: {}", e);
                return Classification::Degraded {
                    verdict: IntentVerdict::new(
                        IntentCategory::Other,
                        0.0,
                        format!("Error in analysis: {}", e),
                    ),
                    error: e.to_string(),
                };
            }
        };

        match parse_verdict(&response) {
            Ok(verdict) => {
                tracing::debug!(
                    "Model classified query as {} ({:.2})",
                    verdict.category,
                    verdict.confidence
                );
                Classification::Model(verdict)
            }
            Err(e) => {
                tracing::warn!("Failed to parse intent response: {}", e);
                tracing::debug!("Response was: {}", response);
                Classification::Heuristic {
                    verdict: heuristic_verdict(query),
                    parse_error: e.to_string(),
                }
            }
        }
    }
}

fn build_user_message(query: &str, context: &QueryContext) -> String {
    if context.is_empty() {
        return query.to_string();
    }

    let mut keys: Vec<&String> = context.keys().collect();
    keys.sort();
    let details = keys
        .into_iter()
        .map(|k| format!("- {}: {}", k, context[k]))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\nAdditional context:\n{}", query, details)
}
