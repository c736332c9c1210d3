//! Catalog configuration

use std::path::{Path, PathBuf};

use crate::embedding::EmbeddingModelName;
use crate::search::DEFAULT_TOP_K;

/// Snapshot file name inside a data directory
pub const SNAPSHOT_FILE: &str = "model_metadata.json";
/// Index directory name inside a data directory
pub const INDEX_DIR: &str = "index";

/// How embeddings are produced
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingConfig {
    /// Pretrained ONNX model via fastembed
    Pretrained {
        model: EmbeddingModelName,
        cache_dir: Option<PathBuf>,
    },
    /// Weight-free hashing embedder with the given dimension
    Offline { dimension: usize },
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::Pretrained {
            model: EmbeddingModelName::default(),
            cache_dir: None,
        }
    }
}

/// Everything needed to open a [`crate::ModelCatalog`]
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    /// Snapshot JSON exported by the leaderboard fetcher
    pub snapshot_path: PathBuf,
    /// Directory owning the vector store and the fingerprint sidecar
    pub index_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    /// Result count for semantic search when the caller gives none
    pub default_top_k: usize,
}

impl CatalogConfig {
    /// Conventional layout: `<data_dir>/model_metadata.json` and `<data_dir>/index`
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            snapshot_path: data_dir.join(SNAPSHOT_FILE),
            index_dir: data_dir.join(INDEX_DIR),
            embedding: EmbeddingConfig::default(),
            default_top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = embedding;
        self
    }

    /// RocksDB directory inside the index directory
    pub fn vectors_dir(&self) -> PathBuf {
        self.index_dir.join("vectors")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_dir_layout() {
        let config = CatalogConfig::from_data_dir("/srv/modelfinder");
        assert_eq!(
            config.snapshot_path,
            PathBuf::from("/srv/modelfinder/model_metadata.json")
        );
        assert_eq!(config.index_dir, PathBuf::from("/srv/modelfinder/index"));
        assert_eq!(
            config.vectors_dir(),
            PathBuf::from("/srv/modelfinder/index/vectors")
        );
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.embedding, EmbeddingConfig::default());
    }
}
