//! Myna Core Library
//!
//! Query routing and retrieval-augmented answers for engineering admissions
//! counselling.
//!
//! # Features
//! - LLM intent classification with a deterministic keyword fallback
//! - Context retrieval from a Pinecone vector index
//! - Domain answers grounded in retrieved cutoff data
//! - Optional server-side conversation threads per session
//! - JSON-lines interaction audit log

pub mod audit;
pub mod config;
pub mod error;
pub mod llm;
pub mod rag;
pub mod routing;
pub mod vector;

pub use audit::{AuditEvent, AuditSink, JsonlAuditSink, TracingAuditSink};
pub use config::{Config, LLMServiceConfig, TierPolicy};
pub use error::{Error, MynaError, Result};
pub use llm::{
    ChatMessage, ConversationClient, Embedder, HttpEmbedder, HttpLLMClient, HttpThreadClient,
    LLMClient, MetricsSnapshot, RunPoller, RunStatus,
};
pub use rag::{ContextRetriever, DomainResponder, RetrievedContext};
pub use routing::{
    heuristic_verdict, Classification, FallbackResponder, Handler, IntentCategory,
    IntentClassifier, IntentVerdict, ProcessingResult, Query, QueryContext, RoutingGraph,
    ServiceStatus,
};
pub use vector::{IndexStats, PineconeStore, VectorMatch, VectorStore};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "myna";
