//! CLI command handlers

pub mod classify;
pub mod config;
pub mod logs;
pub mod query;
pub mod status;

/// Join positional words into one question
pub(crate) fn query_text(words: &[String]) -> anyhow::Result<String> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        anyhow::bail!("A question is required");
    }
    Ok(text)
}
