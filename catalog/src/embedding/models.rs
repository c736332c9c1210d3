//! Supported embedding model names

use std::fmt;
use std::str::FromStr;

use fastembed::EmbeddingModel;

use crate::error::CatalogError;

/// Sentence-embedding models the catalog can be indexed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingModelName {
    /// sentence-transformers/all-MiniLM-L6-v2 (384d)
    #[default]
    AllMiniLmL6V2,
    /// sentence-transformers/all-MiniLM-L12-v2 (384d)
    AllMiniLmL12V2,
    /// BAAI/bge-small-en-v1.5 (384d)
    BgeSmallEnV15,
    /// BAAI/bge-base-en-v1.5 (768d)
    BgeBaseEnV15,
    /// sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2 (384d)
    ParaphraseMultilingualMiniLmL12V2,
}

impl EmbeddingModelName {
    pub const ALL: [EmbeddingModelName; 5] = [
        Self::AllMiniLmL6V2,
        Self::AllMiniLmL12V2,
        Self::BgeSmallEnV15,
        Self::BgeBaseEnV15,
        Self::ParaphraseMultilingualMiniLmL12V2,
    ];

    /// Short name used in configuration and in the index fingerprint
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            Self::AllMiniLmL12V2 => "all-MiniLM-L12-v2",
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::BgeBaseEnV15 => "bge-base-en-v1.5",
            Self::ParaphraseMultilingualMiniLmL12V2 => "paraphrase-multilingual-MiniLM-L12-v2",
        }
    }

    pub(crate) fn to_fastembed(self) -> EmbeddingModel {
        match self {
            Self::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            Self::AllMiniLmL12V2 => EmbeddingModel::AllMiniLML12V2,
            Self::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            Self::BgeBaseEnV15 => EmbeddingModel::BGEBaseENV15,
            Self::ParaphraseMultilingualMiniLmL12V2 => EmbeddingModel::ParaphraseMLMiniLML12V2,
        }
    }
}

impl fmt::Display for EmbeddingModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingModelName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both the short name and the hub-qualified one
        let short = s.rsplit('/').next().unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(short))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                CatalogError::model(format!(
                    "Unsupported embedding model '{}'. Supported: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}
