//! Vector search capability
//!
//! The index itself is built and maintained elsewhere; this module only
//! queries it.

mod pinecone;

pub use pinecone::PineconeStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored next to each vector
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One nearest-neighbour hit, without the raw vector payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorMatch {
    /// Metadata value rendered as text; numbers and booleans are stringified
    pub fn field(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => Some(other.to_string()),
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vector_count: u64,
    pub dimension: Option<usize>,
    pub index_fullness: f64,
}

/// Top-k similarity search over a vector index
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest neighbours of `vector`, best match first
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<VectorMatch>>;

    async fn describe_stats(&self) -> Result<IndexStats>;
}
