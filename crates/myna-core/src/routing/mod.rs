//! Query routing
//!
//! A query enters the [`RoutingGraph`], is classified by the
//! [`IntentClassifier`], and is answered either by the domain responder
//! (engineering admissions, retrieval-augmented) or by the local
//! [`FallbackResponder`].

mod classifier;
mod fallback;
mod graph;

pub use classifier::{heuristic_verdict, parse_verdict, IntentClassifier};
pub use fallback::FallbackResponder;
pub use graph::{
    route, IndexStatus, RoutingGraph, ServiceStatus, ERROR_RESPONSE, ROUTING_THRESHOLD,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Free-form request context supplied by the caller
pub type QueryContext = HashMap<String, serde_json::Value>;

/// A user's question, fixed for the lifetime of one processing cycle
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    text: String,
    user_id: String,
    session_id: String,
    context: QueryContext,
    created_at: DateTime<Utc>,
}

impl Query {
    /// New query with a freshly generated session id
    pub fn new(text: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: user_id.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            context: QueryContext::new(),
            created_at: Utc::now(),
        }
    }

    /// Continue an existing session; blank ids keep the generated one
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        if let Some(id) = session_id.filter(|id| !id.trim().is_empty()) {
            self.session_id = id;
        }
        self
    }

    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = context;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// What a query is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentCategory {
    /// Engineering admissions, cutoffs, college eligibility
    Domain,
    /// Anything else
    Other,
}

impl IntentCategory {
    /// Parse a label from model output; legacy `TNEA`/`FUTURE` labels are accepted
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "DOMAIN" | "TNEA" => Some(Self::Domain),
            "OTHER" | "FUTURE" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "DOMAIN",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output: category, confidence in [0, 1], and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentVerdict {
    pub category: IntentCategory,
    pub confidence: f64,
    pub rationale: String,
}

impl IntentVerdict {
    /// Build a verdict, clamping confidence into [0, 1] (NaN becomes 0)
    pub fn new(category: IntentCategory, confidence: f64, rationale: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            category,
            confidence,
            rationale: rationale.into(),
        }
    }
}

/// How the classifier arrived at its verdict
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The model answered with a well-formed verdict
    Model(IntentVerdict),
    /// The model answered but not with usable JSON; keywords decided
    Heuristic {
        verdict: IntentVerdict,
        parse_error: String,
    },
    /// The model could not be reached; the verdict is OTHER with zero confidence
    Degraded { verdict: IntentVerdict, error: String },
}

impl Classification {
    pub fn verdict(&self) -> &IntentVerdict {
        match self {
            Self::Model(verdict)
            | Self::Heuristic { verdict, .. }
            | Self::Degraded { verdict, .. } => verdict,
        }
    }

    pub fn into_verdict(self) -> IntentVerdict {
        match self {
            Self::Model(verdict)
            | Self::Heuristic { verdict, .. }
            | Self::Degraded { verdict, .. } => verdict,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::Heuristic { .. } => "heuristic",
            Self::Degraded { .. } => "degraded",
        }
    }
}

/// Which node produced the final response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handler {
    DomainResponder,
    FallbackResponder,
    #[serde(rename = "error")]
    Error,
}

impl Handler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainResponder => "DomainResponder",
            Self::FallbackResponder => "FallbackResponder",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single result returned for every query
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub response: String,
    pub session_id: String,
    pub handled_by: Handler,
    /// Absent only when the traversal itself failed
    pub intent: Option<IntentVerdict>,
    pub success: bool,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    /// Diagnostic detail; never shown to the end user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

fn serialize_secs<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(duration.as_secs_f64())
}
