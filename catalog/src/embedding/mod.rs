//! Embedding module for semantic search
//!
//! Wraps a pretrained sentence-embedding model behind the [`Embedder`] trait.
//! The identity of the model is part of the index fingerprint, so swapping
//! models forces a rebuild.

mod discovery;
mod engine;
mod hashing;
mod models;

use crate::error::Result;

pub use discovery::find_model_cache_dir;
pub use engine::VectorEngine;
pub use hashing::HashingEmbedder;
pub use models::EmbeddingModelName;

/// Maps text to fixed-size dense vectors
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model producing the vectors
    fn model_id(&self) -> &str;

    /// Length of every produced vector
    fn dimension(&self) -> usize;

    /// Embed many texts, preserving input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| crate::error::CatalogError::embedding("Model returned no vector"))
    }
}
