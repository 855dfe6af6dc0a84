//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use myna_core::audit::{AuditEvent, AuditSink};
use myna_core::config::{ResponderConfig, RetrievalConfig};
use myna_core::error::{MynaError, Result};
use myna_core::llm::{ChatMessage, ConversationClient, Embedder, LLMClient, RunPoller, RunStatus};
use myna_core::rag::{ContextRetriever, DomainResponder};
use myna_core::routing::{FallbackResponder, IntentClassifier, RoutingGraph};
use myna_core::vector::{IndexStats, Metadata, VectorMatch, VectorStore};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIMS: usize = 4;

/// How the scripted model answers a classification request
#[derive(Clone)]
pub enum ClassifierReply {
    Json(String),
    Prose(String),
    Unreachable,
    Panic,
}

impl ClassifierReply {
    pub fn verdict(intent: &str, confidence: f64) -> Self {
        Self::Json(format!(
            r#"{{"intent": "{}", "confidence": {}, "reasoning": "scripted"}}"#,
            intent, confidence
        ))
    }
}

/// LLM double: classification requests get `classifier`, everything else `answer`
pub struct ScriptedLLM {
    classifier: ClassifierReply,
    answer: Option<String>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLLM {
    pub fn new(classifier: ClassifierReply, answer: Option<&str>) -> Self {
        Self {
            classifier,
            answer: answer.map(str::to_string),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn completions(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests that were not classification requests
    pub fn answer_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !is_classification(m))
            .cloned()
            .collect()
    }
}

fn is_classification(messages: &[ChatMessage]) -> bool {
    messages
        .first()
        .map(|m| m.content.contains("\"intent\""))
        .unwrap_or(false)
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let classification = is_classification(&messages);
        self.requests.lock().unwrap().push(messages);

        if classification {
            return match &self.classifier {
                ClassifierReply::Json(s) | ClassifierReply::Prose(s) => Ok(s.clone()),
                ClassifierReply::Unreachable => {
                    Err(MynaError::Llm("connection refused".to_string()))
                }
                ClassifierReply::Panic => panic!("classifier exploded"),
            };
        }

        self.answer
            .clone()
            .ok_or_else(|| MynaError::Llm("generation unavailable".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    fn embedding_dimensions(&self) -> usize {
        DIMS
    }
}

/// Embedder that always returns the same direction, or always fails
pub struct FixedEmbedder {
    pub fail: bool,
    pub seen: Mutex<Vec<String>>,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self {
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.seen.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(MynaError::Llm("embedding service down".to_string()));
        }
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Brute-force cosine index
pub struct MemoryStore {
    docs: Vec<(String, Vec<f32>, Metadata)>,
    fail: bool,
    pub queries: Mutex<Vec<Vec<f32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: Vec::new(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_college(
        mut self,
        id: &str,
        vector: Vec<f32>,
        college: &str,
        text: &str,
        cutoff: &str,
    ) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("college_name".to_string(), json!(college));
        metadata.insert("text".to_string(), json!(text));
        metadata.insert("cutoff_info".to_string(), json!(cutoff));
        self.docs.push((id.to_string(), vector, metadata));
        self
    }

    /// A few CSE cutoff records
    pub fn admissions() -> Self {
        Self::new()
            .with_college(
                "ceg-cse",
                vec![1.0, 0.0, 0.0, 0.0],
                "College of Engineering, Guindy",
                "B.E. Computer Science and Engineering",
                "OC 199.5, BC 198.0",
            )
            .with_college(
                "psg-cse",
                vec![0.9, 0.1, 0.0, 0.0],
                "PSG College of Technology",
                "B.E. Computer Science and Engineering",
                "OC 197.0, BC 195.5",
            )
            .with_college(
                "gct-mech",
                vec![0.1, 0.9, 0.0, 0.0],
                "Government College of Technology",
                "B.E. Mechanical Engineering",
                "OC 185.0",
            )
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        _filter: Option<&serde_json::Value>,
    ) -> Result<Vec<VectorMatch>> {
        self.queries.lock().unwrap().push(vector.to_vec());
        if self.fail {
            return Err(MynaError::VectorStore("index unreachable".to_string()));
        }

        let mut hits: Vec<VectorMatch> = self
            .docs
            .iter()
            .map(|(id, v, metadata)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, v),
                metadata: metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        if self.fail {
            return Err(MynaError::VectorStore("index unreachable".to_string()));
        }
        Ok(IndexStats {
            total_vector_count: self.docs.len() as u64,
            dimension: Some(DIMS),
            index_fullness: 0.0,
        })
    }
}

/// Captures every audit event
#[derive(Default)]
pub struct RecordingAudit {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    pub fn error_stages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                AuditEvent::Error { stage, .. } => Some(stage.clone()),
                _ => None,
            })
            .collect()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Conversation threads that complete immediately
#[derive(Default)]
pub struct CountingThreads {
    pub created: AtomicUsize,
    pub sent: Mutex<Vec<(String, String)>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_runs: bool,
}

impl CountingThreads {
    pub fn failing_runs() -> Self {
        Self {
            fail_runs: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConversationClient for CountingThreads {
    async fn create_thread(&self, _instructions: &str) -> Result<String> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("thread_{}", n))
    }

    async fn send(&self, thread_id: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((thread_id.to_string(), message.to_string()));
        Ok(())
    }

    async fn start_run(&self, thread_id: &str) -> Result<String> {
        Ok(format!("run_on_{}", thread_id))
    }

    async fn run_status(&self, _thread_id: &str, _run_id: &str) -> Result<RunStatus> {
        if self.fail_runs {
            Ok(RunStatus::Failed("server_error".to_string()))
        } else {
            Ok(RunStatus::Completed)
        }
    }

    async fn cancel_run(&self, _thread_id: &str, _run_id: &str) -> Result<()> {
        Ok(())
    }

    async fn latest_message(&self, thread_id: &str) -> Result<String> {
        Ok(format!("threaded answer from {}", thread_id))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(thread_id.to_string());
        Ok(())
    }
}

pub fn fast_poller() -> RunPoller {
    RunPoller::new(
        Duration::from_millis(1),
        2.0,
        Duration::from_millis(5),
        Duration::from_secs(1),
    )
}

pub struct Harness {
    pub llm: Arc<ScriptedLLM>,
    pub store: Arc<MemoryStore>,
    pub audit: Arc<RecordingAudit>,
    pub threads: Option<Arc<CountingThreads>>,
}

impl Harness {
    pub fn new(classifier: ClassifierReply, answer: Option<&str>, store: MemoryStore) -> Self {
        Self {
            llm: Arc::new(ScriptedLLM::new(classifier, answer)),
            store: Arc::new(store),
            audit: Arc::new(RecordingAudit::default()),
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: CountingThreads) -> Self {
        self.threads = Some(Arc::new(threads));
        self
    }

    pub fn responder(
        &self,
        embedder: FixedEmbedder,
        retrieval: RetrievalConfig,
    ) -> DomainResponder {
        let retriever = ContextRetriever::new(self.store.clone(), retrieval);
        let responder = DomainResponder::new(
            self.llm.clone(),
            Arc::new(embedder),
            retriever,
            &ResponderConfig::default(),
            self.audit.clone(),
        );
        match self.threads {
            Some(ref threads) => responder.with_threads(threads.clone(), fast_poller()),
            None => responder,
        }
    }

    pub fn graph(&self) -> RoutingGraph {
        self.graph_with(FixedEmbedder::new())
    }

    pub fn graph_with(&self, embedder: FixedEmbedder) -> RoutingGraph {
        RoutingGraph::new(
            IntentClassifier::new(self.llm.clone()),
            self.responder(embedder, RetrievalConfig::default()),
            FallbackResponder::new(),
            self.audit.clone(),
        )
    }
}
