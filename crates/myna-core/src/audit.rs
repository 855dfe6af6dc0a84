//! Interaction audit trail
//!
//! The pipeline reports every routing decision and failure to an
//! [`AuditSink`]. Recording is fire-and-forget: a sink never returns an
//! error and never makes the pipeline wait on anything but a local write.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const MAX_LOGGED_RESPONSE_CHARS: usize = 500;

/// One auditable step of a query's life
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    SessionStart {
        user_id: String,
        session_id: String,
    },
    UserQuery {
        user_id: String,
        session_id: String,
        query: String,
    },
    IntentAnalysis {
        user_id: String,
        session_id: String,
        intent: String,
        confidence: f64,
        reasoning: String,
        source: String,
    },
    NodeRouting {
        user_id: String,
        session_id: String,
        target_node: String,
    },
    RagRetrieval {
        session_id: String,
        retrieved_documents: usize,
        context_length: usize,
    },
    Response {
        user_id: String,
        session_id: String,
        processing_node: String,
        response: String,
        response_length: usize,
    },
    Error {
        user_id: String,
        session_id: String,
        query: String,
        error: String,
        stage: String,
    },
    SessionEnd {
        user_id: String,
        session_id: String,
        duration_seconds: f64,
    },
}

impl AuditEvent {
    /// Response event with the text truncated for the log
    pub fn response(user_id: &str, session_id: &str, node: &str, response: &str) -> Self {
        let response_length = response.chars().count();
        let logged = if response_length > MAX_LOGGED_RESPONSE_CHARS {
            let head: String = response.chars().take(MAX_LOGGED_RESPONSE_CHARS).collect();
            format!("{}...", head)
        } else {
            response.to_string()
        };

        Self::Response {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            processing_node: node.to_string(),
            response: logged,
            response_length,
        }
    }

    /// Name of the event as written to the log
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => "session_start",
            Self::UserQuery { .. } => "user_query",
            Self::IntentAnalysis { .. } => "intent_analysis",
            Self::NodeRouting { .. } => "node_routing",
            Self::RagRetrieval { .. } => "rag_retrieval",
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
            Self::SessionEnd { .. } => "session_end",
        }
    }
}

#[derive(Serialize)]
struct Stamped<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

fn to_json_line(event: &AuditEvent) -> String {
    let stamped = Stamped {
        timestamp: Utc::now(),
        event,
    };
    serde_json::to_string(&stamped).unwrap_or_else(|e| {
        format!(
            r#"{{"event":"{}","serialization_error":"{}"}}"#,
            event.name(),
            e
        )
    })
}

/// Receiver of audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits events on the `myna::audit` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let line = to_json_line(event);
        match event {
            AuditEvent::Error { .. } => {
                tracing::error!(target: "myna::audit", event = event.name(), "{}", line)
            }
            _ => tracing::info!(target: "myna::audit", event = event.name(), "{}", line),
        }
    }
}

/// Appends events as JSON lines to a file, and mirrors them to tracing
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    /// Open (or create) the log file, creating parent directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) {
        TracingAuditSink.record(event);

        let mut line = to_json_line(event);
        line.push('\n');

        let written = match self.file.lock() {
            Ok(mut file) => file.write_all(line.as_bytes()),
            Err(poisoned) => poisoned.into_inner().write_all(line.as_bytes()),
        };
        if let Err(e) = written {
            tracing::warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }
}

/// Last `limit` lines of an interaction log; a missing file has none
pub fn read_recent(path: &Path, limit: usize) -> Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let lines = BufReader::new(file).lines().collect::<std::io::Result<Vec<_>>>()?;
    let skip = lines.len().saturating_sub(limit);
    Ok(lines.into_iter().skip(skip).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn start(session: &str) -> AuditEvent {
        AuditEvent::SessionStart {
            user_id: "u1".to_string(),
            session_id: session.to_string(),
        }
    }

    #[test]
    fn test_jsonl_sink_appends_tagged_events() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("interactions.log");
        let sink = JsonlAuditSink::open(&path).unwrap();

        sink.record(&start("s1"));
        sink.record(&AuditEvent::NodeRouting {
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            target_node: "FallbackResponder".to_string(),
        });

        let lines = read_recent(&path, 10).unwrap();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["event"], "session_start");
        assert_eq!(first["session_id"], "s1");
        assert!(first["timestamp"].is_string());

        let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["target_node"], "FallbackResponder");
    }

    #[test]
    fn test_read_recent_keeps_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("interactions.log");
        let sink = JsonlAuditSink::open(&path).unwrap();
        for i in 0..5 {
            sink.record(&start(&format!("s{}", i)));
        }

        let tail = read_recent(&path, 2).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail[0].contains("\"s3\""));
        assert!(tail[1].contains("\"s4\""));
    }

    #[test]
    fn test_read_recent_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(read_recent(&dir.path().join("none.log"), 100)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_long_responses_truncated() {
        let long = "x".repeat(800);
        match AuditEvent::response("u", "s", "DomainResponder", &long) {
            AuditEvent::Response {
                response,
                response_length,
                ..
            } => {
                assert_eq!(response_length, 800);
                assert_eq!(response.chars().count(), 503);
                assert!(response.ends_with("..."));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
