//! Semantic query service
//!
//! Embeds free text and asks the vector index for its nearest entries.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::storage::{Metadata, QueryHit, VectorIndex};

/// Number of results returned when the caller does not say
pub const DEFAULT_TOP_K: usize = 3;

/// A ranked semantic match
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Projected document that was embedded
    pub document: String,
    /// Flattened record metadata
    pub metadata: Metadata,
    /// Cosine similarity to the query
    pub similarity: f32,
}

impl SearchHit {
    /// Model id recorded in the metadata, empty if missing
    pub fn model_id(&self) -> &str {
        self.metadata
            .get("model_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Text metadata field, empty if missing or not text
    pub fn text(&self, key: &str) -> &str {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }
}

impl From<QueryHit> for SearchHit {
    fn from(hit: QueryHit) -> Self {
        Self {
            document: hit.source_text,
            metadata: hit.metadata,
            similarity: hit.similarity,
        }
    }
}

/// Anything that can answer a free-text nearest-neighbour query.
///
/// The lookup and filter layers depend on this rather than on the concrete
/// service so they can run against fakes.
pub trait SemanticSource {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>>;
}

/// Embeds queries and searches the shared index
#[derive(Clone)]
pub struct SemanticSearch {
    embedder: Arc<dyn Embedder>,
    index: Arc<RwLock<VectorIndex>>,
}

impl SemanticSearch {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<RwLock<VectorIndex>>) -> Self {
        Self { embedder, index }
    }
}

impl SemanticSource for SemanticSearch {
    /// Up to `top_k` hits, best first. Empty for `top_k == 0` or an empty index.
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;
        let hits = self.index.read().query(&query_embedding, top_k);

        log::debug!("Semantic search '{}' returned {} hits", query, hits.len());
        Ok(hits.into_iter().map(SearchHit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::projector::{project, to_metadata};
    use crate::record::ModelRecord;
    use crate::storage::IndexEntry;

    fn service(records: &[ModelRecord]) -> (tempfile::TempDir, SemanticSearch) {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        let index = VectorIndex::open(dir.path()).unwrap();

        let entries = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let text = project(r);
                IndexEntry {
                    id: i.to_string(),
                    embedding: embedder.embed(&text).unwrap(),
                    source_text: text,
                    metadata: to_metadata(r),
                }
            })
            .collect();
        index.upsert_bulk(entries).unwrap();

        let search = SemanticSearch::new(embedder, Arc::new(RwLock::new(index)));
        (dir, search)
    }

    fn record(id: &str, description: &str) -> ModelRecord {
        ModelRecord {
            description: description.to_string(),
            ..ModelRecord::new(id)
        }
    }

    #[test]
    fn test_fewer_entries_than_top_k() {
        let (_dir, search) = service(&[
            record("org/xlm-qa", "multilingual question answering"),
            record("org/sd", "image diffusion"),
        ]);

        let hits = search.search("multilingual question answering", 3).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].model_id(), "org/xlm-qa");
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn test_top_k_zero_is_empty() {
        let (_dir, search) = service(&[record("org/a", "anything")]);
        assert!(search.search("anything", 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index_is_empty() {
        let (_dir, search) = service(&[]);
        assert!(search.search("anything", DEFAULT_TOP_K).unwrap().is_empty());
    }
}
