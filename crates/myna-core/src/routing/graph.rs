//! Routing graph: entry → classify → domain or fallback → done
//!
//! Every call to [`RoutingGraph::process`] yields exactly one
//! [`ProcessingResult`]. Errors and panics raised while traversing the graph
//! are converted into an error result at this boundary.

use super::{
    Classification, FallbackResponder, Handler, IntentCategory, IntentClassifier, ProcessingResult,
    Query,
};
use crate::audit::{AuditEvent, AuditSink, JsonlAuditSink, TracingAuditSink};
use crate::config::Config;
use crate::error::{MynaError, Result};
use crate::llm::{
    Embedder, HttpEmbedder, HttpLLMClient, HttpThreadClient, LLMClient, MetricsSnapshot, RunPoller,
};
use crate::rag::{ContextRetriever, DomainResponder};
use crate::vector::{IndexStats, PineconeStore, VectorStore};
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Domain verdicts must be strictly more confident than this to take the domain path
pub const ROUTING_THRESHOLD: f64 = 0.5;

/// Shown to the user when the graph itself failed
pub const ERROR_RESPONSE: &str =
    "I'm sorry, but I encountered an error while processing your request. Please try again.";

/// Pick the handler for a classification
pub fn route(classification: &Classification) -> Handler {
    if let Classification::Degraded { .. } = classification {
        return Handler::FallbackResponder;
    }
    let verdict = classification.verdict();
    if verdict.category == IntentCategory::Domain && verdict.confidence > ROUTING_THRESHOLD {
        Handler::DomainResponder
    } else {
        Handler::FallbackResponder
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Entry,
    Domain,
    Fallback,
    Done,
}

struct Traversal<'q> {
    query: &'q Query,
    classification: Option<Classification>,
    handled_by: Option<Handler>,
    response: Option<String>,
}

/// Vector index health as seen by `status`
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<IndexStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Service health snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub index: IndexStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<MetricsSnapshot>,
    pub active_threads: usize,
}

/// Query processing pipeline
pub struct RoutingGraph {
    classifier: IntentClassifier,
    domain: DomainResponder,
    fallback: FallbackResponder,
    audit: Arc<dyn AuditSink>,
    llm_metrics: Option<Arc<HttpLLMClient>>,
}

impl RoutingGraph {
    pub fn new(
        classifier: IntentClassifier,
        domain: DomainResponder,
        fallback: FallbackResponder,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            classifier,
            domain,
            fallback,
            audit,
            llm_metrics: None,
        }
    }

    /// Wire the HTTP-backed pipeline from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Arc::new(HttpLLMClient::new(config.llm_service.clone())?);
        let llm: Arc<dyn LLMClient> = http.clone();
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(llm.clone()));
        let store: Arc<dyn VectorStore> = Arc::new(PineconeStore::new(&config.vector_store)?);

        let audit: Arc<dyn AuditSink> = match config.audit.log_path {
            Some(ref path) => Arc::new(JsonlAuditSink::open(path)?),
            None => Arc::new(TracingAuditSink),
        };

        let retriever = ContextRetriever::new(store, config.retrieval.clone());
        let mut domain = DomainResponder::new(
            llm.clone(),
            embedder,
            retriever,
            &config.responder,
            audit.clone(),
        );

        let threads = &config.responder.threads;
        if threads.enabled {
            let client = HttpThreadClient::new(&config.llm_service, threads)?;
            domain = domain.with_threads(Arc::new(client), RunPoller::from_config(threads));
            tracing::info!("Conversation threads enabled");
        }

        let mut graph = Self::new(
            IntentClassifier::new(llm),
            domain,
            FallbackResponder::new(),
            audit,
        );
        graph.llm_metrics = Some(http);
        Ok(graph)
    }

    pub async fn process(&self, query: Query) -> ProcessingResult {
        self.process_cancellable(query, &CancellationToken::new()).await
    }

    /// Process a query; firing `cancel` abandons any pending thread run
    pub async fn process_cancellable(
        &self,
        query: Query,
        cancel: &CancellationToken,
    ) -> ProcessingResult {
        let started = Instant::now();
        let timestamp = Utc::now();

        self.audit.record(&AuditEvent::SessionStart {
            user_id: query.user_id().to_string(),
            session_id: query.session_id().to_string(),
        });

        let outcome = AssertUnwindSafe(self.traverse(&query, cancel))
            .catch_unwind()
            .await;

        let completed = match outcome {
            Ok(Ok(traversal)) => Ok(traversal),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(panic_message(panic.as_ref())),
        };

        let duration = started.elapsed();
        self.audit.record(&AuditEvent::SessionEnd {
            user_id: query.user_id().to_string(),
            session_id: query.session_id().to_string(),
            duration_seconds: duration.as_secs_f64(),
        });

        match completed {
            Ok((response, handled_by, classification)) => ProcessingResult {
                response,
                session_id: query.session_id().to_string(),
                handled_by,
                intent: Some(classification.into_verdict()),
                success: true,
                duration,
                error: None,
                timestamp,
            },
            Err(error) => {
                tracing::error!("Query processing failed: {}", error);
                self.audit.record(&AuditEvent::Error {
                    user_id: query.user_id().to_string(),
                    session_id: query.session_id().to_string(),
                    query: query.text().to_string(),
                    error: error.clone(),
                    stage: "graph execution".to_string(),
                });
                ProcessingResult {
                    response: ERROR_RESPONSE.to_string(),
                    session_id: query.session_id().to_string(),
                    handled_by: Handler::Error,
                    intent: None,
                    success: false,
                    duration,
                    error: Some(error),
                    timestamp,
                }
            }
        }
    }

    async fn traverse(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<(String, Handler, Classification)> {
        let mut state = Traversal {
            query,
            classification: None,
            handled_by: None,
            response: None,
        };

        let mut node = Node::Entry;
        while node != Node::Done {
            node = match node {
                Node::Entry => self.enter(&mut state).await,
                Node::Domain => {
                    let response = self.domain.respond(state.query, cancel).await;
                    state.finish(Handler::DomainResponder, response);
                    Node::Done
                }
                Node::Fallback => {
                    let classification = state.classification.as_ref().ok_or_else(|| {
                        MynaError::Routing("fallback reached without a classification".into())
                    })?;
                    let response = self
                        .fallback
                        .respond(query.text(), classification.verdict());
                    self.audit.record(&AuditEvent::response(
                        query.user_id(),
                        query.session_id(),
                        Handler::FallbackResponder.as_str(),
                        &response,
                    ));
                    state.finish(Handler::FallbackResponder, response);
                    Node::Done
                }
                Node::Done => Node::Done,
            };
        }

        match (state.response, state.handled_by, state.classification) {
            (Some(response), Some(handled_by), Some(classification)) => {
                Ok((response, handled_by, classification))
            }
            _ => Err(MynaError::Routing(
                "traversal ended without a response".into(),
            )),
        }
    }

    async fn enter(&self, state: &mut Traversal<'_>) -> Node {
        let query = state.query;
        self.audit.record(&AuditEvent::UserQuery {
            user_id: query.user_id().to_string(),
            session_id: query.session_id().to_string(),
            query: query.text().to_string(),
        });

        let classification = self.classifier.classify(query.text(), query.context()).await;
        let verdict = classification.verdict();
        self.audit.record(&AuditEvent::IntentAnalysis {
            user_id: query.user_id().to_string(),
            session_id: query.session_id().to_string(),
            intent: verdict.category.to_string(),
            confidence: verdict.confidence,
            reasoning: verdict.rationale.clone(),
            source: classification.source().to_string(),
        });
        if let Classification::Degraded { ref error, .. } = classification {
            self.audit.record(&AuditEvent::Error {
                user_id: query.user_id().to_string(),
                session_id: query.session_id().to_string(),
                query: query.text().to_string(),
                error: error.clone(),
                stage: "intent classification".to_string(),
            });
        }

        let handler = route(&classification);
        tracing::info!(
            "Routing session {} to {} ({} {:.2}, {})",
            query.session_id(),
            handler,
            verdict.category,
            verdict.confidence,
            classification.source()
        );
        self.audit.record(&AuditEvent::NodeRouting {
            user_id: query.user_id().to_string(),
            session_id: query.session_id().to_string(),
            target_node: handler.to_string(),
        });

        state.classification = Some(classification);
        match handler {
            Handler::DomainResponder => Node::Domain,
            _ => Node::Fallback,
        }
    }

    /// Classify without routing or answering
    pub async fn classify(&self, text: &str, context: &super::QueryContext) -> Classification {
        self.classifier.classify(text, context).await
    }

    /// Index health plus LLM request metrics when available
    pub async fn status(&self) -> ServiceStatus {
        let index = match self.domain.index_stats().await {
            Ok(stats) => IndexStatus {
                status: "connected".to_string(),
                stats: Some(stats),
                error: None,
            },
            Err(e) => IndexStatus {
                status: "disconnected".to_string(),
                stats: None,
                error: Some(e.to_string()),
            },
        };

        ServiceStatus {
            index,
            llm: self.llm_metrics.as_ref().map(|client| client.metrics()),
            active_threads: self.domain.active_threads(),
        }
    }

    /// Dispose of the session's conversation thread, if it has one
    pub async fn end_session(&self, session_id: &str) -> Result<bool> {
        self.domain.release_session(session_id).await
    }

    /// Dispose of all conversation threads
    pub async fn shutdown(&self) -> usize {
        let deleted = self.domain.release_all().await;
        if deleted > 0 {
            tracing::info!("Deleted {} conversation threads on shutdown", deleted);
        }
        deleted
    }
}

impl Traversal<'_> {
    fn finish(&mut self, handler: Handler, response: String) {
        self.handled_by = Some(handler);
        self.response = Some(response);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic during query processing".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::IntentVerdict;

    fn model(category: IntentCategory, confidence: f64) -> Classification {
        Classification::Model(IntentVerdict::new(category, confidence, "test"))
    }

    #[test]
    fn test_route_threshold_is_strict() {
        assert_eq!(route(&model(IntentCategory::Domain, 0.9)), Handler::DomainResponder);
        assert_eq!(route(&model(IntentCategory::Domain, 0.51)), Handler::DomainResponder);
        assert_eq!(route(&model(IntentCategory::Domain, 0.5)), Handler::FallbackResponder);
        assert_eq!(route(&model(IntentCategory::Domain, 0.4)), Handler::FallbackResponder);
        assert_eq!(route(&model(IntentCategory::Other, 0.99)), Handler::FallbackResponder);
    }

    #[test]
    fn test_degraded_always_falls_back() {
        let degraded = Classification::Degraded {
            verdict: IntentVerdict::new(IntentCategory::Domain, 1.0, "forced"),
            error: "down".to_string(),
        };
        assert_eq!(route(&degraded), Handler::FallbackResponder);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "panic: boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "panic: bang");
    }
}
