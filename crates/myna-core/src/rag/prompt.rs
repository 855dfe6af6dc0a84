//! Domain system prompt and per-turn message

use crate::config::TierPolicy;

/// System prompt for the admissions expert
pub fn build_system_prompt(reference_year: i32, tiers: &TierPolicy) -> String {
    format!(
        r#"You are an expert counsellor for Tamil Nadu Engineering Admissions (TNEA).
Use {year} as the default cutoff year unless the student names another year.

When recommending colleges, compare the student's score with each cutoff and group the results:
{tiers}

Show results as crisp, categorized bullet points only: college, branch, cutoff, and tier.
Answer only from the provided context. If the requested data is missing from the context,
say so explicitly instead of guessing; never invent colleges or cutoff values."#,
        year = reference_year,
        tiers = tiers.render()
    )
}

/// Per-turn message carrying the retrieved context and the question
pub fn build_user_message(context: &str, query: &str) -> String {
    format!("Context: {}\n\nUser Query: {}", context, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_year_and_tiers() {
        let prompt = build_system_prompt(2023, &TierPolicy::default());
        assert!(prompt.contains("Use 2023 as the default cutoff year"));
        assert!(prompt.contains("- Definite:"));
        assert!(prompt.contains("- Reach:"));
        assert!(prompt.contains("never invent"));
    }

    #[test]
    fn test_user_message_layout() {
        assert_eq!(
            build_user_message("ctx", "which colleges?"),
            "Context: ctx\n\nUser Query: which colleges?"
        );
    }
}
