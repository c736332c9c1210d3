//! Consistency gate
//!
//! Keeps the vector index in step with the snapshot. The fingerprint of the
//! last successful build lives in a plain-text sidecar; it is written last and
//! acts as the commit marker, so any failure mid-rebuild is retried on the
//! next start instead of leaving a stale index in place.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::embedding::Embedder;
use crate::error::{CatalogError, Result};
use crate::projector::{project, to_metadata};
use crate::record::{sha256_hex, RecordStore};
use crate::storage::{IndexEntry, VectorIndex};

/// Sidecar file name inside the index directory
pub const FINGERPRINT_FILE: &str = "catalog_fingerprint.txt";

/// Digest identifying the snapshot content and embedding model of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFingerprint(String);

impl CatalogFingerprint {
    /// Fingerprint `store` as embedded by `model_id`
    pub fn compute(store: &RecordStore, model_id: &str) -> Self {
        let material = format!("{}\n{}", store.digest(), model_id);
        Self(sha256_hex(material.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What `ensure_consistent` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Fingerprint matched; the index was left untouched
    UpToDate,
    /// The index was rebuilt from the snapshot
    Rebuilt { deleted: usize, inserted: usize },
}

/// Decides when the index must be rebuilt and performs the rebuild
#[derive(Debug, Clone)]
pub struct ConsistencyGate {
    sidecar: PathBuf,
}

impl ConsistencyGate {
    /// Gate whose sidecar lives in `index_dir`
    pub fn new(index_dir: impl AsRef<Path>) -> Self {
        Self {
            sidecar: index_dir.as_ref().join(FINGERPRINT_FILE),
        }
    }

    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar
    }

    /// Fingerprint recorded by the last successful rebuild, if any
    pub fn committed(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.sidecar) {
            Ok(content) => {
                let digest = content.trim();
                Ok((!digest.is_empty()).then(|| digest.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// True when `current` differs from the committed fingerprint.
    /// A missing or empty sidecar always needs a rebuild.
    pub fn needs_rebuild(&self, current: &CatalogFingerprint) -> Result<bool> {
        Ok(self.committed()?.as_deref() != Some(current.as_str()))
    }

    /// Rebuild `index` from `store` unless the fingerprint already matches.
    ///
    /// Order: delete all → project → embed batch → bulk upsert → commit
    /// fingerprint. Callers must hold the index writer lock.
    pub fn ensure_consistent(
        &self,
        store: &RecordStore,
        embedder: &dyn Embedder,
        index: &VectorIndex,
    ) -> Result<RebuildOutcome> {
        let fingerprint = CatalogFingerprint::compute(store, embedder.model_id());

        if !self.needs_rebuild(&fingerprint)? {
            log::info!("Using cached index ({} entries), fingerprint unchanged", index.len());
            return Ok(RebuildOutcome::UpToDate);
        }

        log::info!(
            "Catalog changed or no committed index; rebuilding {} records with {}",
            store.len(),
            embedder.model_id()
        );

        let stale = index.ids();
        if !stale.is_empty() {
            log::info!("Deleting {} previous index entries", stale.len());
        }
        index.delete_all(&stale)?;

        let texts: Vec<String> = store.records().iter().map(project).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = embedder.embed_batch(&text_refs)?;

        if embeddings.len() != texts.len() {
            return Err(CatalogError::embedding(format!(
                "Expected {} embeddings, model returned {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<IndexEntry> = store
            .records()
            .iter()
            .zip(texts)
            .zip(embeddings)
            .enumerate()
            .map(|(idx, ((record, source_text), embedding))| IndexEntry {
                id: idx.to_string(),
                embedding,
                source_text,
                metadata: to_metadata(record),
            })
            .collect();
        let inserted = entries.len();
        index.upsert_bulk(entries)?;

        self.commit(&fingerprint)?;
        log::info!("Index rebuilt with {} entries", inserted);

        Ok(RebuildOutcome::Rebuilt {
            deleted: stale.len(),
            inserted,
        })
    }

    /// Remove the committed fingerprint, forcing the next rebuild
    pub fn invalidate(&self) -> Result<()> {
        match std::fs::remove_file(&self.sidecar) {
            Ok(()) => {
                log::info!("Removed committed fingerprint {}", self.sidecar.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the fingerprint atomically (temp file + rename)
    fn commit(&self, fingerprint: &CatalogFingerprint) -> Result<()> {
        if let Some(parent) = self.sidecar.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.sidecar.with_extension("txt.tmp");
        std::fs::write(&tmp, fingerprint.as_str())?;
        std::fs::rename(&tmp, &self.sidecar)?;
        Ok(())
    }
}
