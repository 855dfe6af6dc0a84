//! Retrieval-augmented answers for admissions queries

use super::prompt::{build_system_prompt, build_user_message};
use super::retriever::{ContextRetriever, RetrievedContext};
use super::threads::ThreadRegistry;
use crate::audit::{AuditEvent, AuditSink};
use crate::config::ResponderConfig;
use crate::error::{MynaError, Result};
use crate::llm::{ChatMessage, ConversationClient, Embedder, LLMClient, RunPoller};
use crate::routing::Query;
use crate::vector::IndexStats;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shown to the user when retrieval or generation fails
pub const DOMAIN_APOLOGY: &str = "I apologize, but I couldn't look up admissions data for \
     your question right now. Please try again in a moment.";

/// Value of each component of the stand-in embedding
pub const PLACEHOLDER_EMBEDDING_VALUE: f32 = 0.01;

struct ThreadedChat {
    client: Arc<dyn ConversationClient>,
    registry: ThreadRegistry,
    poller: RunPoller,
}

/// Answers domain queries from retrieved index context
pub struct DomainResponder {
    llm: Arc<dyn LLMClient>,
    embedder: Arc<dyn Embedder>,
    retriever: ContextRetriever,
    threads: Option<ThreadedChat>,
    system_prompt: String,
    audit: Arc<dyn AuditSink>,
}

impl DomainResponder {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
        retriever: ContextRetriever,
        config: &ResponderConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            llm,
            embedder,
            retriever,
            threads: None,
            system_prompt: build_system_prompt(config.reference_year, &config.tiers),
            audit,
        }
    }

    /// Keep one server-side thread per session instead of resending the
    /// system prompt every turn
    pub fn with_threads(mut self, client: Arc<dyn ConversationClient>, poller: RunPoller) -> Self {
        self.threads = Some(ThreadedChat {
            client,
            registry: ThreadRegistry::new(),
            poller,
        });
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Number of sessions that currently own a thread
    pub fn active_threads(&self) -> usize {
        self.threads.as_ref().map_or(0, |t| t.registry.len())
    }

    pub async fn index_stats(&self) -> Result<IndexStats> {
        self.retriever.index_stats().await
    }

    /// Answer `query`. Never fails: retrieval or generation errors are
    /// audited and replaced with [`DOMAIN_APOLOGY`].
    pub async fn respond(&self, query: &Query, cancel: &CancellationToken) -> String {
        let embedding = self.embed_query(query.text()).await;

        let max_chars = self.retriever.config().max_context_chars;
        let context = match self.retriever.retrieve(&embedding, max_chars).await {
            Ok(context) => context,
            Err(e) => return self.fail(query, &e, "context retrieval"),
        };
        self.record_retrieval(query, &context);

        let message = build_user_message(&context.text, query.text());
        let answer = match self.generate(query.session_id(), &message, cancel).await {
            Ok(answer) => answer,
            Err(e) => return self.fail(query, &e, "response generation"),
        };

        self.audit.record(&AuditEvent::response(
            query.user_id(),
            query.session_id(),
            "DomainResponder",
            &answer,
        ));
        answer
    }

    /// Embedding of the query, or a constant stand-in when the embedding
    /// service fails
    async fn embed_query(&self, text: &str) -> Vec<f32> {
        match self.embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(
                    capability = e.is_capability_failure(),
                    "Embedding failed, using placeholder vector: {}",
                    e
                );
                vec![PLACEHOLDER_EMBEDDING_VALUE; self.embedder.dimensions()]
            }
        }
    }

    async fn generate(
        &self,
        session_id: &str,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if let Some(ref chat) = self.threads {
            if !session_id.is_empty() {
                match self.generate_threaded(chat, session_id, message, cancel).await {
                    Ok(answer) => return Ok(answer),
                    Err(MynaError::Cancelled) => return Err(MynaError::Cancelled),
                    Err(e) => {
                        tracing::warn!(
                            "Thread path failed for session {}, falling back to single-shot: {}",
                            session_id,
                            e
                        );
                    }
                }
            }
        }

        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(message),
        ];
        self.llm.chat_completion(messages).await
    }

    async fn generate_threaded(
        &self,
        chat: &ThreadedChat,
        session_id: &str,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let thread_id = match chat.registry.get(session_id) {
            Some(id) => id,
            None => {
                let id = chat.client.create_thread(&self.system_prompt).await?;
                tracing::info!("Created thread {} for session {}", id, session_id);
                chat.registry.insert(session_id, id.clone());
                id
            }
        };

        chat.client.send(&thread_id, message).await?;
        let run_id = chat.client.start_run(&thread_id).await?;
        chat.poller
            .wait(chat.client.as_ref(), &thread_id, &run_id, cancel)
            .await?;
        chat.client.latest_message(&thread_id).await
    }

    /// Dispose of the session's thread. Returns whether one existed.
    pub async fn release_session(&self, session_id: &str) -> Result<bool> {
        let Some(ref chat) = self.threads else {
            return Ok(false);
        };
        match chat.registry.remove(session_id) {
            Some(thread_id) => {
                chat.client.delete_thread(&thread_id).await?;
                tracing::info!("Deleted thread {} for session {}", thread_id, session_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Dispose of every thread; failures are logged. Returns how many were deleted.
    pub async fn release_all(&self) -> usize {
        let Some(ref chat) = self.threads else {
            return 0;
        };
        let mut deleted = 0;
        for (session_id, thread_id) in chat.registry.drain() {
            match chat.client.delete_thread(&thread_id).await {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!(
                    "Failed to delete thread {} for session {}: {}",
                    thread_id,
                    session_id,
                    e
                ),
            }
        }
        deleted
    }

    fn record_retrieval(&self, query: &Query, context: &RetrievedContext) {
        self.audit.record(&AuditEvent::RagRetrieval {
            session_id: query.session_id().to_string(),
            retrieved_documents: context.included,
            context_length: context.text.chars().count(),
        });
    }

    fn fail(&self, query: &Query, error: &MynaError, stage: &str) -> String {
        tracing::error!("Domain responder {} failed: {}", stage, error);
        self.audit.record(&AuditEvent::Error {
            user_id: query.user_id().to_string(),
            session_id: query.session_id().to_string(),
            query: query.text().to_string(),
            error: error.to_string(),
            stage: stage.to_string(),
        });
        DOMAIN_APOLOGY.to_string()
    }
}
