//! ModelFinder Catalog
//!
//! Retrieval core for a catalog of model-hub leaderboard metadata: a
//! snapshot-backed record store, a persistent embedding index kept in step
//! with the snapshot through content fingerprinting, and the lookup/filter
//! layer that falls back to semantic search when deterministic matching
//! finds nothing.
//!
//! ## Features
//!
//! - **Normalized records** - Loosely typed snapshot fields are normalized once at load time
//! - **Persistent index** - RocksDB storage with HNSW search for large catalogs
//! - **Consistency gate** - SHA-256 fingerprint of snapshot + model decides rebuilds
//! - **Strategy lookup** - Exact id → id substring → id-confirmed semantic match
//!
//! ## Example
//!
//! ```ignore
//! use modelfinder_catalog::{CatalogConfig, FilterCriteria, ModelCatalog};
//!
//! let catalog = ModelCatalog::open(CatalogConfig::from_data_dir("data"))?;
//! catalog.ensure_consistent()?;
//!
//! let hits = catalog.search("multilingual question answering", 3)?;
//! let outcome = catalog.filter(&FilterCriteria {
//!     task: "text-generation".into(),
//!     min_likes: 200,
//!     ..Default::default()
//! });
//! catalog.close()?;
//! ```

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod gate;
pub mod lookup;
pub mod projector;
pub mod record;
pub mod search;
pub mod storage;

// Re-exports for convenience
pub use catalog::ModelCatalog;
pub use config::{CatalogConfig, EmbeddingConfig};
pub use embedding::{Embedder, EmbeddingModelName, HashingEmbedder, VectorEngine};
pub use error::CatalogError;
pub use filter::{FilterCriteria, FilterOutcome, FILTER_LIMIT};
pub use gate::{CatalogFingerprint, ConsistencyGate, RebuildOutcome};
pub use lookup::{LookupOutcome, MatchKind};
pub use projector::{from_metadata, project, to_metadata};
pub use record::{Benchmarks, ModelRecord, RecordStore};
pub use search::{SearchHit, SemanticSearch, SemanticSource, DEFAULT_TOP_K};
pub use storage::{IndexEntry, Metadata, MetadataValue, VectorIndex};
