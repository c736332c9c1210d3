//! Catalog service
//!
//! Composes the record store, embedder, vector index, consistency gate and
//! query service into one explicitly opened and closed service. Nothing here
//! runs at construction time beyond opening storage; the index is brought in
//! line with the snapshot by an explicit [`ModelCatalog::ensure_consistent`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{CatalogConfig, EmbeddingConfig};
use crate::embedding::{Embedder, HashingEmbedder, VectorEngine};
use crate::error::Result;
use crate::filter::{filter, FilterCriteria, FilterOutcome};
use crate::gate::{ConsistencyGate, RebuildOutcome};
use crate::lookup::{Lookup, LookupOutcome};
use crate::record::RecordStore;
use crate::search::{SearchHit, SemanticSearch, SemanticSource};
use crate::storage::VectorIndex;

/// The model catalog and its semantic index
pub struct ModelCatalog {
    config: CatalogConfig,
    store: RecordStore,
    embedder: Arc<dyn Embedder>,
    index: Arc<RwLock<VectorIndex>>,
    gate: ConsistencyGate,
    search: SemanticSearch,
}

impl ModelCatalog {
    /// Open the catalog, loading the embedder described by the config
    pub fn open(config: CatalogConfig) -> Result<Self> {
        let embedder = build_embedder(&config.embedding)?;
        Self::open_with_embedder(config, embedder)
    }

    /// Open the catalog with a caller-supplied embedder
    pub fn open_with_embedder(config: CatalogConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = RecordStore::load(&config.snapshot_path)?;
        Self::with_store(config, store, embedder)
    }

    /// Open the index for an already-loaded record store
    pub fn with_store(
        config: CatalogConfig,
        store: RecordStore,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let index = Arc::new(RwLock::new(VectorIndex::open(config.vectors_dir())?));
        let gate = ConsistencyGate::new(&config.index_dir);
        let search = SemanticSearch::new(Arc::clone(&embedder), Arc::clone(&index));

        log::info!(
            "ModelCatalog opened: {} records, index at {}",
            store.len(),
            config.index_dir.display()
        );

        Ok(Self {
            config,
            store,
            embedder,
            index,
            gate,
            search,
        })
    }

    /// Rebuild the index if the snapshot or embedding model changed.
    ///
    /// Holds the index writer lock for the whole rebuild so no query sees a
    /// half-written index.
    pub fn ensure_consistent(&self) -> Result<RebuildOutcome> {
        let index = self.index.write();
        self.gate
            .ensure_consistent(&self.store, self.embedder.as_ref(), &index)
    }

    /// Drop the committed fingerprint so the next `ensure_consistent` rebuilds
    pub fn invalidate(&self) -> Result<()> {
        self.gate.invalidate()
    }

    /// Semantic search over the index
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.search.search(query, top_k)
    }

    /// Resolve an id or fuzzy name to a record
    pub fn lookup(&self, query: &str) -> LookupOutcome<'_> {
        Lookup::standard(&self.search).lookup(&self.store, query)
    }

    /// Filter records by attributes, with semantic fallback
    pub fn filter(&self, criteria: &FilterCriteria) -> FilterOutcome<'_> {
        filter(&self.store, criteria, &self.search)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Get catalog statistics
    pub fn stats(&self) -> Result<serde_json::Value> {
        let committed = self.gate.committed()?;
        Ok(serde_json::json!({
            "records": self.store.len(),
            "snapshotDigest": self.store.digest(),
            "embeddingModel": self.embedder.model_id(),
            "committedFingerprint": committed,
            "index": self.index.read().stats(),
        }))
    }

    /// Flush and release the index
    pub fn close(self) -> Result<()> {
        drop(self.search);
        match Arc::try_unwrap(self.index) {
            Ok(index) => index.into_inner().close(),
            Err(_) => {
                log::warn!("Vector index still shared at close; it will flush on drop");
                Ok(())
            }
        }
    }
}

fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Ok(match config {
        EmbeddingConfig::Pretrained { model, cache_dir } => {
            Arc::new(VectorEngine::new(*model, cache_dir.as_deref())?)
        }
        EmbeddingConfig::Offline { dimension } => {
            log::info!("Using offline hashing embedder ({}d)", dimension);
            Arc::new(HashingEmbedder::new(*dimension))
        }
    })
}
