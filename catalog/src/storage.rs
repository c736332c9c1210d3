//! RocksDB vector index with HNSW search
//!
//! Persistent storage for index entries using RocksDB with LZ4 compression.
//! Uses instant-distance HNSW for O(log n) semantic search once the
//! collection is large enough; smaller collections are scanned exactly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use instant_distance::{Builder, HnswMap, Point, Search};
use parking_lot::RwLock;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const ENTRY_PREFIX: &str = "entry:";

/// Below this many entries queries use an exact scan instead of HNSW
const HNSW_MIN_ENTRIES: usize = 256;

/// Scalar metadata value; the index only stores flat scalar metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Null => write!(f, "None"),
        }
    }
}

impl From<Option<f64>> for MetadataValue {
    fn from(value: Option<f64>) -> Self {
        value.map(Self::Float).unwrap_or(Self::Null)
    }
}

/// Flattened, scalar-only record copy stored next to each embedding
pub type Metadata = BTreeMap<String, MetadataValue>;

/// One indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Positional identifier assigned at rebuild time (not the model id)
    pub id: String,
    pub embedding: Vec<f32>,
    pub source_text: String,
    pub metadata: Metadata,
}

/// A query result, best match first
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub source_text: String,
    pub metadata: Metadata,
    pub similarity: f32,
}

/// HNSW point wrapper for semantic search
#[derive(Clone)]
struct IndexPoint {
    vector: Vec<f32>,
}

impl Point for IndexPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance = 1 - similarity (HNSW finds minimum)
        1.0 - cosine_similarity(&self.vector, &other.vector)
    }
}

/// RocksDB-backed vector index
pub struct VectorIndex {
    db: Arc<DB>,
    entries: Arc<DashMap<String, IndexEntry>>,
    hnsw: Arc<RwLock<Option<HnswMap<IndexPoint, String>>>>,
    write_batches: AtomicU64,
}

impl VectorIndex {
    /// Open (or create) the index stored at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_background_jobs(2);
        opts.set_bytes_per_sync(1048576); // 1MB
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;

        log::info!("VectorIndex opened at: {}", path.display());

        let index = Self {
            db: Arc::new(db),
            entries: Arc::new(DashMap::new()),
            hnsw: Arc::new(RwLock::new(None)),
            write_batches: AtomicU64::new(0),
        };

        index.load_cache()?;
        Ok(index)
    }

    /// Load persisted entries into memory on startup
    fn load_cache(&self) -> Result<()> {
        let mut count = 0;
        let mut skipped = 0;

        for item in self.db.iterator(IteratorMode::Start) {
            let (key, value) = item?;
            let key_str = String::from_utf8_lossy(&key);

            let Some(id) = key_str.strip_prefix(ENTRY_PREFIX) else {
                continue;
            };

            // Gracefully handle deserialization errors
            match bincode::deserialize::<IndexEntry>(&value) {
                Ok(entry) => {
                    self.entries.insert(id.to_string(), entry);
                    count += 1;
                }
                Err(e) => {
                    log::warn!("Failed to deserialize index entry {}: {}. Skipping.", id, e);
                    skipped += 1;
                }
            }
        }

        if count > 0 {
            log::info!("Loaded {} index entries from disk", count);
        }
        if skipped > 0 {
            log::warn!("Skipped {} index entries due to deserialization errors", skipped);
        }

        self.rebuild_hnsw();
        Ok(())
    }

    /// Identifiers of all stored entries, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a stored entry by identifier
    pub fn get(&self, id: &str) -> Option<IndexEntry> {
        self.entries.get(id).map(|e| e.clone())
    }

    /// Delete the given identifiers. Unknown ids and an empty set are no-ops.
    pub fn delete_all(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        for id in ids {
            batch.delete(entry_key(id).as_bytes());
        }
        self.db.write(batch)?;
        self.db.flush()?;
        self.write_batches.fetch_add(1, Ordering::Relaxed);

        for id in ids {
            self.entries.remove(id);
        }
        self.rebuild_hnsw();

        log::debug!("Deleted {} index entries", ids.len());
        Ok(())
    }

    /// Replace the whole entry set with `entries`.
    ///
    /// Existing entries are deleted first, then the new set is written in a
    /// single batch. A crash in between leaves the index empty.
    pub fn upsert_bulk(&self, entries: Vec<IndexEntry>) -> Result<()> {
        self.delete_all(&self.ids())?;

        if entries.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        for entry in &entries {
            batch.put(entry_key(&entry.id).as_bytes(), bincode::serialize(entry)?);
        }
        self.db.write(batch)?;
        self.db.flush()?;
        self.write_batches.fetch_add(1, Ordering::Relaxed);

        let count = entries.len();
        for entry in entries {
            self.entries.insert(entry.id.clone(), entry);
        }
        self.rebuild_hnsw();

        log::debug!("Inserted {} index entries", count);
        Ok(())
    }

    /// Return up to `top_k` entries nearest to `embedding`, best first.
    ///
    /// An empty index yields an empty result.
    pub fn query(&self, embedding: &[f32], top_k: usize) -> Vec<QueryHit> {
        if top_k == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let ranked = match self.hnsw.read().as_ref() {
            Some(hnsw) => self.hnsw_search(hnsw, embedding, top_k),
            None => self.linear_search(embedding, top_k),
        };

        ranked
            .into_iter()
            .filter_map(|(id, similarity)| {
                self.entries.get(&id).map(|entry| QueryHit {
                    id,
                    source_text: entry.source_text.clone(),
                    metadata: entry.metadata.clone(),
                    similarity,
                })
            })
            .collect()
    }

    fn hnsw_search(
        &self,
        hnsw: &HnswMap<IndexPoint, String>,
        embedding: &[f32],
        top_k: usize,
    ) -> Vec<(String, f32)> {
        let query_point = IndexPoint {
            vector: embedding.to_vec(),
        };
        let mut search = Search::default();

        let mut results: Vec<(String, f32)> = hnsw
            .search(&query_point, &mut search)
            .take(top_k)
            .map(|item| (item.value.clone(), 1.0 - item.distance))
            .collect();
        rank(&mut results);
        results
    }

    /// Exact cosine scan
    fn linear_search(&self, embedding: &[f32], top_k: usize) -> Vec<(String, f32)> {
        let mut results: Vec<(String, f32)> = self
            .entries
            .iter()
            .map(|entry| {
                let similarity = cosine_similarity(embedding, &entry.value().embedding);
                (entry.key().clone(), similarity)
            })
            .collect();

        rank(&mut results);
        results.truncate(top_k);
        results
    }

    /// Rebuild the HNSW graph from the cached entries
    fn rebuild_hnsw(&self) {
        if self.entries.len() < HNSW_MIN_ENTRIES {
            *self.hnsw.write() = None;
            return;
        }

        let (points, values): (Vec<IndexPoint>, Vec<String>) = self
            .entries
            .iter()
            .map(|e| {
                (
                    IndexPoint {
                        vector: e.value().embedding.clone(),
                    },
                    e.key().clone(),
                )
            })
            .unzip();

        let hnsw = Builder::default().ef_construction(100).build(points, values);
        *self.hnsw.write() = Some(hnsw);
    }

    /// Get index statistics
    pub fn stats(&self) -> serde_json::Value {
        let dimension = self
            .entries
            .iter()
            .next()
            .map(|e| e.value().embedding.len())
            .unwrap_or(0);

        serde_json::json!({
            "entries": self.entries.len(),
            "dimension": dimension,
            "hnsw": self.hnsw.read().is_some(),
            "writeBatches": self.write_batches(),
        })
    }

    /// Number of write batches applied since this index was opened
    pub fn write_batches(&self) -> u64 {
        self.write_batches.load(Ordering::Relaxed)
    }

    /// Flush and release the database
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        log::debug!("VectorIndex closed");
        Ok(())
    }
}

/// Best similarity first, ties broken by id
fn rank(results: &mut [(String, f32)]) {
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

fn entry_key(id: &str) -> String {
    format!("{}{}", ENTRY_PREFIX, id)
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, embedding: Vec<f32>) -> IndexEntry {
        let mut metadata = Metadata::new();
        metadata.insert("model_id".into(), MetadataValue::Text(format!("org/{}", id)));
        IndexEntry {
            id: id.to_string(),
            embedding,
            source_text: format!("document {}", id),
            metadata,
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_dimensions() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_query_empty_index_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn test_query_ranks_best_first() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        index
            .upsert_bulk(vec![
                entry("0", vec![1.0, 0.0, 0.0]),
                entry("1", vec![0.0, 1.0, 0.0]),
                entry("2", vec![0.7, 0.7, 0.0]),
            ])
            .unwrap();

        let hits = index.query(&[1.0, 0.1, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "0");
        assert_eq!(hits[1].id, "2");
        assert_eq!(hits[0].source_text, "document 0");
        assert_eq!(
            hits[0].metadata.get("model_id").and_then(|v| v.as_str()),
            Some("org/0")
        );
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn test_query_top_k_zero() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        index.upsert_bulk(vec![entry("0", vec![1.0, 0.0])]).unwrap();
        assert!(index.query(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_upsert_bulk_replaces_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        index
            .upsert_bulk(vec![entry("0", vec![1.0, 0.0]), entry("1", vec![0.0, 1.0])])
            .unwrap();
        index.upsert_bulk(vec![entry("7", vec![1.0, 1.0])]).unwrap();

        assert_eq!(index.ids(), vec!["7".to_string()]);
    }

    #[test]
    fn test_delete_all_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        index.upsert_bulk(vec![entry("0", vec![1.0, 0.0])]).unwrap();
        let before = index.write_batches();

        index.delete_all(&[]).unwrap();
        assert_eq!(index.write_batches(), before);
        assert_eq!(index.len(), 1);

        // Deleting twice is harmless
        index.delete_all(&["0".to_string()]).unwrap();
        index.delete_all(&["0".to_string()]).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = VectorIndex::open(dir.path()).unwrap();
            index
                .upsert_bulk(vec![entry("0", vec![1.0, 0.0]), entry("1", vec![0.0, 1.0])])
                .unwrap();
            index.close().unwrap();
        }

        let index = VectorIndex::open(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("1").unwrap().embedding, vec![0.0, 1.0]);
        assert_eq!(index.query(&[0.0, 1.0], 1)[0].id, "1");
    }

    #[test]
    fn test_hnsw_used_for_large_collections() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        let entries = (0..HNSW_MIN_ENTRIES + 10)
            .map(|i| {
                let angle = i as f32 * 0.01;
                entry(&i.to_string(), vec![angle.cos(), angle.sin()])
            })
            .collect();
        index.upsert_bulk(entries).unwrap();

        assert_eq!(index.stats()["hnsw"], true);
        let hits = index.query(&[1.0, 0.0], 5);
        assert_eq!(hits.len(), 5);
        assert!(hits[0].similarity > 0.99);
    }

    #[test]
    fn test_hnsw_ties_ordered_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path()).unwrap();
        let mut entries: Vec<IndexEntry> = (0..HNSW_MIN_ENTRIES + 10)
            .map(|i| {
                let angle = i as f32 * 0.01;
                entry(&i.to_string(), vec![angle.cos(), angle.sin()])
            })
            .collect();
        for id in ["dup-2", "dup-0", "dup-1"] {
            entries.push(entry(id, vec![0.0, -1.0]));
        }
        index.upsert_bulk(entries).unwrap();
        assert_eq!(index.stats()["hnsw"], true);

        let hits = index.query(&[0.0, -1.0], 3);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["dup-0", "dup-1", "dup-2"]);
    }

    #[test]
    fn test_metadata_value_display() {
        assert_eq!(MetadataValue::Float(12.5).to_string(), "12.5");
        assert_eq!(MetadataValue::Null.to_string(), "None");
        assert_eq!(MetadataValue::from(None).to_string(), "None");
    }
}
