//! Vector embedding engine
//!
//! Production [`Embedder`] backed by a fastembed ONNX sentence-embedding model.

use std::path::Path;

use fastembed::{InitOptions, TextEmbedding};
use parking_lot::Mutex;

use super::discovery::find_model_cache_dir;
use super::models::EmbeddingModelName;
use super::Embedder;
use crate::error::{CatalogError, Result};

/// Texts per ONNX forward pass during bulk embedding
const BATCH_SIZE: usize = 64;

/// Sentence-embedding engine
///
/// Loaded once per process and shared by the rebuild path and the query path.
pub struct VectorEngine {
    model: Mutex<TextEmbedding>,
    name: EmbeddingModelName,
    dimension: usize,
}

impl VectorEngine {
    /// Load `name`, caching weights under the discovered model directory
    ///
    /// # Arguments
    /// * `name` - Which pretrained model to load
    /// * `cache_dir` - Optional explicit weight cache directory
    pub fn new(name: EmbeddingModelName, cache_dir: Option<&Path>) -> Result<Self> {
        let cache_dir = find_model_cache_dir(cache_dir)?;

        log::info!("Loading embedding model {} from {}", name, cache_dir.display());

        let options = InitOptions::new(name.to_fastembed())
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| CatalogError::model(format!("Failed to load {}: {}", name, e)))?;

        // Get dimension by encoding test string
        let sample = model
            .embed(vec!["test"], None)
            .map_err(|e| CatalogError::model(format!("Failed to encode test string: {}", e)))?;
        let dimension = sample.first().map(Vec::len).unwrap_or(0);

        log::info!("VectorEngine ready ({}, {}d)", name, dimension);

        Ok(Self {
            model: Mutex::new(model),
            name,
            dimension,
        })
    }
}

impl Embedder for VectorEngine {
    fn model_id(&self) -> &str {
        self.name.as_str()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = self.model.lock();
        model
            .embed(texts.to_vec(), Some(BATCH_SIZE))
            .map_err(|e| CatalogError::embedding(format!("Failed to encode texts: {}", e)))
    }
}
