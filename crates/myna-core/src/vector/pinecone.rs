//! Pinecone data-plane client

use super::{IndexStats, VectorMatch, VectorStore};
use crate::config::VectorStoreConfig;
use crate::error::{MynaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queries a Pinecone index over its REST data plane
pub struct PineconeStore {
    http_client: reqwest::Client,
    host: Option<String>,
    api_key: Option<String>,
    namespace: Option<String>,
}

impl PineconeStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let host = config.host.as_ref().map(|h| {
            let h = h.trim_end_matches('/');
            if h.starts_with("http://") || h.starts_with("https://") {
                h.to_string()
            } else {
                format!("https://{}", h)
            }
        });

        if host.is_none() {
            tracing::warn!("No Pinecone host configured; retrieval will fail until one is set");
        }

        Ok(Self {
            http_client,
            host,
            api_key: config.api_key.clone(),
            namespace: config.namespace.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let host = self.host.as_ref().ok_or_else(|| {
            MynaError::VectorStore(
                "Pinecone index not initialized - check host and API key configuration".into(),
            )
        })?;
        Ok(format!("{}/{}", host, path))
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let mut req = self.http_client.post(self.endpoint(path)?).json(body);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Api-Key", api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| MynaError::VectorStore(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MynaError::VectorStore(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| MynaError::VectorStore(format!("invalid response: {}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    index_fullness: f64,
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            filter,
            namespace: self.namespace.as_deref(),
        };

        tracing::debug!("Pinecone query with vector length {}", vector.len());
        let response: QueryResponse = self.post("query", &request).await?;
        tracing::info!("Pinecone search completed: {} documents found", response.matches.len());

        Ok(response.matches)
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let stats: StatsResponse = self
            .post("describe_index_stats", &serde_json::json!({}))
            .await?;

        Ok(IndexStats {
            total_vector_count: stats.total_vector_count,
            dimension: stats.dimension,
            index_fullness: stats.index_fullness,
        })
    }
}
