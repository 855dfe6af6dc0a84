//! Error types for myna

use thiserror::Error;

/// Result type alias using MynaError
pub type Result<T> = std::result::Result<T, MynaError>;

/// Error type alias for convenience
pub type Error = MynaError;

/// Main error type for myna
#[derive(Debug, Error)]
pub enum MynaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Conversation thread error: {0}")]
    Thread(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MynaError {
    /// Whether the error came from an external capability (LLM, embeddings,
    /// vector search, threads) rather than from local logic
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            Self::Llm(_)
                | Self::VectorStore(_)
                | Self::Thread(_)
                | Self::Timeout(_)
                | Self::Http(_)
                | Self::ExternalError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_failure_classification() {
        assert!(MynaError::Llm("quota".to_string()).is_capability_failure());
        assert!(MynaError::VectorStore("down".to_string()).is_capability_failure());
        assert!(!MynaError::Config("bad".to_string()).is_capability_failure());
        assert!(!MynaError::Cancelled.is_capability_failure());
    }
}
