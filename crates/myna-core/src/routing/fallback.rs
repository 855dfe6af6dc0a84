//! Local responder for queries outside the admissions domain

use super::classifier::word_regex;
use super::IntentVerdict;
use lazy_static::lazy_static;
use regex::Regex;

const BASE_RESPONSE: &str = "Thank you for your query!

Right now I specialise in Tamil Nadu Engineering Admissions (TNEA): cutoff marks, \
college recommendations, and admission guidance. Support for other topics is still \
being built.

Here is what I can help you with today:
- TNEA cutoff marks and college selection
- Engineering college recommendations in Tamil Nadu
- Admission process guidance
- Previous year trends and analysis

Is there anything about Tamil Nadu engineering admissions I can help you with instead?";

struct TopicNote {
    keywords: &'static [&'static str],
    note: &'static str,
}

const TOPIC_NOTES: &[TopicNote] = &[
    TopicNote {
        keywords: &["medical", "mbbs", "neet"],
        note: "I notice you're asking about medical admissions. I currently focus on \
               engineering admissions; medical admission guidance is planned for a future update.",
    },
    TopicNote {
        keywords: &["arts", "commerce", "ba", "bcom"],
        note: "I see you're interested in arts or commerce courses. Support for these \
               streams is coming soon.",
    },
    TopicNote {
        keywords: &["job", "jobs", "career", "placement", "placements"],
        note: "Career guidance and placement information are in development.",
    },
];

lazy_static! {
    static ref TOPIC_PATTERNS: Vec<(Regex, &'static str)> = TOPIC_NOTES
        .iter()
        .map(|topic| (word_regex(topic.keywords), topic.note))
        .collect();
}

/// Answers out-of-scope queries with a fixed template
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    /// Base template plus the note for the first matching topic, if any.
    /// Deterministic in `query`; the verdict only feeds the log.
    pub fn respond(&self, query: &str, intent: &IntentVerdict) -> String {
        tracing::info!(
            "Fallback responder handling query with intent {} ({:.2})",
            intent.category,
            intent.confidence
        );

        match TOPIC_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(query))
        {
            Some((_, note)) => format!("{}\n\n{}", BASE_RESPONSE, note),
            None => BASE_RESPONSE.to_string(),
        }
    }
}
