//! Configuration management

pub mod tiers;

use crate::error::{MynaError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use tiers::{TierBand, TierPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Text generation and embedding service
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Vector index holding the admissions documents
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Context assembly
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Domain answer synthesis
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Interaction audit log
    #[serde(default)]
    pub audit: AuditConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the OpenAI-compatible service
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// Model name for chat completions (classification and answers)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default = "default_embedding_url", skip_serializing_if = "Option::is_none")]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions, also the length of the placeholder vector
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// API key (optional, for authenticated services)
    #[serde(default = "default_llm_api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_chat_model(),
            embedding_url: default_embedding_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            api_key: default_llm_api_key(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_llm_url() -> String {
    std::env::var("MYNA_LLM_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

fn default_embedding_url() -> Option<String> {
    env_value("MYNA_EMBEDDING_URL")
}

fn default_llm_api_key() -> Option<String> {
    env_value("MYNA_LLM_API_KEY")
}

fn default_chat_model() -> String {
    std::env::var("MYNA_LLM_MODEL").unwrap_or_else(|_| "gpt-4".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("MYNA_EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-large".to_string())
}

fn default_embedding_dimensions() -> usize {
    std::env::var("MYNA_EMBEDDING_DIMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3072)
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_timeout() -> u64 {
    30
}

/// Pinecone index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Data-plane host of the index, e.g. `https://tnea-abc123.svc.pinecone.io`
    #[serde(default = "default_pinecone_host", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default = "default_pinecone_api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Index name, informational only (the host already pins the index)
    #[serde(default = "default_pinecone_index", skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: default_pinecone_host(),
            api_key: default_pinecone_api_key(),
            index: default_pinecone_index(),
            namespace: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_pinecone_host() -> Option<String> {
    env_value("MYNA_PINECONE_HOST")
}

fn default_pinecone_api_key() -> Option<String> {
    env_value("MYNA_PINECONE_API_KEY")
}

fn default_pinecone_index() -> Option<String> {
    env_value("MYNA_PINECONE_INDEX")
}

/// A metadata field rendered as a labelled line inside a context block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubField {
    pub key: String,
    pub label: String,
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours requested from the index
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Character budget of the assembled context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Metadata key holding the entity (college) name
    #[serde(default = "default_entity_field")]
    pub entity_field: String,

    /// Metadata key holding the document excerpt
    #[serde(default = "default_excerpt_field")]
    pub excerpt_field: String,

    /// Structured sub-record fields, rendered in order
    #[serde(default = "default_sub_fields")]
    pub sub_fields: Vec<SubField>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            entity_field: default_entity_field(),
            excerpt_field: default_excerpt_field(),
            sub_fields: default_sub_fields(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_max_context_chars() -> usize {
    2000
}

fn default_entity_field() -> String {
    "college_name".to_string()
}

fn default_excerpt_field() -> String {
    "text".to_string()
}

fn default_sub_fields() -> Vec<SubField> {
    vec![SubField {
        key: "cutoff_info".to_string(),
        label: "Cutoff Info".to_string(),
    }]
}

/// Domain responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Default year for cutoff data when the user does not name one
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,

    /// Recommendation tiers by score margin over the cutoff
    #[serde(default)]
    pub tiers: TierPolicy,

    #[serde(default)]
    pub threads: ThreadConfig,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            reference_year: default_reference_year(),
            tiers: TierPolicy::default(),
            threads: ThreadConfig::default(),
        }
    }
}

fn default_reference_year() -> i32 {
    2024
}

/// Persistent conversation thread configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Use server-side threads; defaults to on when `MYNA_ASSISTANT_ID` is set
    #[serde(default = "default_threads_enabled", skip_serializing_if = "is_false")]
    pub enabled: bool,

    /// Assistant that executes runs on the threads
    #[serde(default = "default_assistant_id", skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,

    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,

    #[serde(default = "default_poll_backoff")]
    pub poll_backoff: f64,

    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,

    /// Upper bound on waiting for one run to finish
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        let assistant_id = default_assistant_id();
        Self {
            enabled: assistant_id.is_some(),
            assistant_id,
            poll_initial_ms: default_poll_initial_ms(),
            poll_backoff: default_poll_backoff(),
            poll_max_ms: default_poll_max_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

fn default_threads_enabled() -> bool {
    default_assistant_id().is_some()
}

fn default_assistant_id() -> Option<String> {
    env_value("MYNA_ASSISTANT_ID")
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_poll_initial_ms() -> u64 {
    250
}

fn default_poll_backoff() -> f64 {
    2.0
}

fn default_poll_max_ms() -> u64 {
    2000
}

fn default_max_wait_secs() -> u64 {
    60
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines interaction log; events only go to tracing when unset
    #[serde(default = "default_audit_log", skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: default_audit_log(),
        }
    }
}

fn default_audit_log() -> Option<PathBuf> {
    env_value("MYNA_AUDIT_LOG").map(PathBuf::from)
}

/// Non-empty environment value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a path; a missing file yields the defaults
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults suitable for writing to disk: credentials stay in the
    /// environment and are never copied into the file
    pub fn template() -> Self {
        let mut config = Self::default();
        config.llm_service.api_key = None;
        config.vector_store.api_key = None;
        config
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path (`MYNA_CONFIG` overrides)
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("MYNA_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(MynaError::Config("retrieval.top_k must be positive".into()));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(MynaError::Config(
                "retrieval.max_context_chars must be positive".into(),
            ));
        }
        let threads = &self.responder.threads;
        if !threads.poll_backoff.is_finite() || threads.poll_backoff < 1.0 {
            return Err(MynaError::Config(
                "responder.threads.poll_backoff must be a finite value of at least 1.0".into(),
            ));
        }
        if threads.poll_initial_ms == 0 {
            return Err(MynaError::Config(
                "responder.threads.poll_initial_ms must be positive".into(),
            ));
        }
        if threads.poll_max_ms < threads.poll_initial_ms {
            return Err(MynaError::Config(
                "responder.threads.poll_max_ms must not be below poll_initial_ms".into(),
            ));
        }
        if threads.max_wait_secs == 0 {
            return Err(MynaError::Config(
                "responder.threads.max_wait_secs must be positive".into(),
            ));
        }
        if threads.enabled && threads.assistant_id.is_none() {
            return Err(MynaError::Config(
                "responder.threads.enabled requires an assistant_id".into(),
            ));
        }
        self.responder.tiers.validate()
    }
}
