//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat completion and embeddings via OpenAI-compatible services
//! - Server-side conversation threads with bounded run polling

mod client;
mod http_embedder;
mod poller;
mod threads;
mod traits;

pub use client::{ChatMessage, HttpLLMClient, LLMClient, MetricsSnapshot};
pub use http_embedder::HttpEmbedder;
pub use poller::RunPoller;
pub use threads::{ConversationClient, HttpThreadClient, RunStatus};
pub use traits::*;
