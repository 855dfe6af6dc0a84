//! Context retrieval from the vector index

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::vector::{IndexStats, VectorMatch, VectorStore};
use serde::Serialize;
use std::sync::Arc;

/// Context used when the index returned nothing
pub const NO_DOCUMENTS_CONTEXT: &str = "No specific documents found in the knowledge base. \
     This may indicate the index needs to be populated with admissions data.";

/// Context used when matches exist but even the best one exceeds the budget
pub const NO_RELEVANT_CONTEXT: &str = "No relevant context extracted from documents.";

const ENTITY_LABEL: &str = "College";

/// One retrieved document, flattened from index metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextDocument {
    pub source_id: String,
    pub relevance_score: f32,
    pub entity_name: Option<String>,
    pub excerpt: Option<String>,
    /// (label, value) pairs in configured order
    pub fields: Vec<(String, String)>,
}

impl ContextDocument {
    /// Labelled block as it appears in the prompt context
    pub fn render(&self, rank: usize) -> String {
        let mut block = format!("Document {} (relevance: {:.3}):\n", rank, self.relevance_score);
        if let Some(ref name) = self.entity_name {
            block.push_str(&format!("{}: {}\n", ENTITY_LABEL, name));
        }
        if let Some(ref excerpt) = self.excerpt {
            block.push_str(excerpt);
            block.push('\n');
        }
        for (label, value) in &self.fields {
            block.push_str(&format!("{}: {}\n", label, value));
        }
        block.push('\n');
        block
    }
}

/// Retrieved documents plus the bounded context string built from them
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    /// All matches, best first
    pub documents: Vec<ContextDocument>,
    /// How many leading documents made it into `text`
    pub included: usize,
    pub text: String,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Top-k similarity search turned into a prompt-ready context
pub struct ContextRetriever {
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl ContextRetriever {
    pub fn new(store: Arc<dyn VectorStore>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Search the index and assemble at most `max_context_chars` of context.
    /// Search errors propagate.
    pub async fn retrieve(
        &self,
        query_embedding: &[f32],
        max_context_chars: usize,
    ) -> Result<RetrievedContext> {
        let matches = self
            .store
            .query(query_embedding, self.config.top_k, None)
            .await?;
        Ok(self.assemble(matches, max_context_chars))
    }

    pub async fn index_stats(&self) -> Result<IndexStats> {
        self.store.describe_stats().await
    }

    /// Order matches by relevance and greedily append whole blocks until the
    /// next one would exceed the budget (measured in characters)
    pub fn assemble(
        &self,
        mut matches: Vec<VectorMatch>,
        max_context_chars: usize,
    ) -> RetrievedContext {
        if matches.is_empty() {
            tracing::warn!("Vector search returned no matches");
            return RetrievedContext {
                documents: Vec::new(),
                included: 0,
                text: NO_DOCUMENTS_CONTEXT.to_string(),
            };
        }

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        let documents: Vec<ContextDocument> = matches.iter().map(|m| self.to_document(m)).collect();

        let mut text = String::new();
        let mut used = 0usize;
        let mut included = 0usize;
        for (i, doc) in documents.iter().enumerate() {
            let block = doc.render(i + 1);
            let len = block.chars().count();
            if used + len > max_context_chars {
                break;
            }
            text.push_str(&block);
            used += len;
            included += 1;
        }

        tracing::debug!(
            "Assembled context from {}/{} documents ({} chars)",
            included,
            documents.len(),
            used
        );

        if included == 0 {
            text = NO_RELEVANT_CONTEXT.to_string();
        }

        RetrievedContext {
            documents,
            included,
            text,
        }
    }

    fn to_document(&self, hit: &VectorMatch) -> ContextDocument {
        ContextDocument {
            source_id: hit.id.clone(),
            relevance_score: hit.score,
            entity_name: hit.field(&self.config.entity_field),
            excerpt: hit.field(&self.config.excerpt_field),
            fields: self
                .config
                .sub_fields
                .iter()
                .filter_map(|f| hit.field(&f.key).map(|v| (f.label.clone(), v)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Metadata;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoStore;

    #[async_trait]
    impl VectorStore for NoStore {
        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _filter: Option<&serde_json::Value>,
        ) -> Result<Vec<VectorMatch>> {
            Ok(Vec::new())
        }

        async fn describe_stats(&self) -> Result<IndexStats> {
            Ok(IndexStats::default())
        }
    }

    fn retriever() -> ContextRetriever {
        ContextRetriever::new(Arc::new(NoStore), RetrievalConfig::default())
    }

    fn hit(id: &str, score: f32, college: &str, text: &str) -> VectorMatch {
        let mut metadata = Metadata::new();
        metadata.insert("college_name".to_string(), json!(college));
        metadata.insert("text".to_string(), json!(text));
        metadata.insert("cutoff_info".to_string(), json!("OC 195.5"));
        VectorMatch {
            id: id.to_string(),
            score,
            metadata,
        }
    }

    #[test]
    fn test_block_format() {
        let context =
            retriever().assemble(vec![hit("a", 0.91234, "Anna University", "CSE")], 2000);
        assert_eq!(
            context.text,
            "Document 1 (relevance: 0.912):\nCollege: Anna University\nCSE\nCutoff Info: OC 195.5\n\n"
        );
        assert_eq!(context.included, 1);
    }

    #[test]
    fn test_sorted_by_descending_score() {
        let context = retriever().assemble(
            vec![hit("low", 0.2, "B", "b"), hit("high", 0.9, "A", "a")],
            2000,
        );
        assert_eq!(context.documents[0].source_id, "high");
        assert!(context.text.starts_with("Document 1 (relevance: 0.900):\nCollege: A"));
    }

    /// Five matches whose rendered blocks are exactly `len` chars each
    fn fixed_width_matches(len: usize) -> Vec<VectorMatch> {
        (0..5)
            .map(|i| {
                let score = 0.9 - i as f32 * 0.1;
                let header = format!("Document {} (relevance: {:.3}):\n", i + 1, score);
                let excerpt = "x".repeat(len - header.chars().count() - 2);
                let mut metadata = Metadata::new();
                metadata.insert("text".to_string(), json!(excerpt));
                VectorMatch {
                    id: format!("d{}", i),
                    score,
                    metadata,
                }
            })
            .collect()
    }

    #[test]
    fn test_greedy_budget_drops_whole_blocks() {
        let context = retriever().assemble(fixed_width_matches(400), 1000);

        for (i, doc) in context.documents.iter().enumerate() {
            assert_eq!(doc.render(i + 1).chars().count(), 400);
        }
        assert_eq!(context.included, 2);
        assert_eq!(context.documents.len(), 5);
        assert_eq!(context.text.chars().count(), 800);
        assert!(!context.text.contains("Document 3"));
    }

    #[test]
    fn test_block_ending_exactly_on_budget_is_kept() {
        let context = retriever().assemble(fixed_width_matches(400), 800);
        assert_eq!(context.included, 2);
        assert_eq!(context.text.chars().count(), 800);

        let context = retriever().assemble(fixed_width_matches(400), 799);
        assert_eq!(context.included, 1);
        assert_eq!(context.text.chars().count(), 400);
    }

    #[test]
    fn test_empty_results_use_sentinel() {
        let context = retriever().assemble(Vec::new(), 2000);
        assert!(context.is_empty());
        assert_eq!(context.text, NO_DOCUMENTS_CONTEXT);
    }

    #[test]
    fn test_oversized_first_block() {
        let context = retriever().assemble(vec![hit("a", 0.5, "A", &"y".repeat(500))], 100);
        assert_eq!(context.included, 0);
        assert_eq!(context.text, NO_RELEVANT_CONTEXT);
    }

    proptest::proptest! {
        #[test]
        fn prop_context_never_exceeds_budget(
            lengths in proptest::collection::vec(0usize..600, 1..8),
            budget in 50usize..3000,
        ) {
            let matches = lengths
                .iter()
                .enumerate()
                .map(|(i, len)| {
                    hit(&format!("d{}", i), 1.0 / (i + 1) as f32, "C", &"z".repeat(*len))
                })
                .collect();
            let context = retriever().assemble(matches, budget);
            if context.included > 0 {
                proptest::prop_assert!(context.text.chars().count() <= budget);
            } else {
                proptest::prop_assert_eq!(context.text.as_str(), NO_RELEVANT_CONTEXT);
            }
        }
    }

    #[tokio::test]
    async fn test_retrieve_queries_store() {
        let context = retriever().retrieve(&[0.1, 0.2], 2000).await.unwrap();
        assert_eq!(context.text, NO_DOCUMENTS_CONTEXT);
    }
}
