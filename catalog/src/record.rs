//! Model records and the snapshot-backed record store
//!
//! The snapshot is the leaderboard export: a JSON array of loosely typed
//! objects. Every object is normalized into a [`ModelRecord`] at load time so
//! nothing downstream has to branch on list-vs-string or number-vs-string.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, Result};

/// Per-benchmark leaderboard scores (0-100), absent when not evaluated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub bbh: Option<f64>,
    pub ifeval: Option<f64>,
    pub math_lvl5: Option<f64>,
    pub gpqa: Option<f64>,
    pub mmlu_pro: Option<f64>,
}

impl Benchmarks {
    /// Benchmarks as `(label, score)` pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> {
        [
            ("BBH", self.bbh),
            ("IFEval", self.ifeval),
            ("MATH Lvl 5", self.math_lvl5),
            ("GPQA", self.gpqa),
            ("MMLU-PRO", self.mmlu_pro),
        ]
        .into_iter()
    }
}

/// One cataloged model, normalized from the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Unique key, equal to the hub full name (`org/name`)
    pub model_id: String,
    pub display_name: String,
    pub description: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub license: String,
    pub likes: u64,
    pub score_average: Option<f64>,
    pub benchmarks: Benchmarks,
    pub param_count_billions: Option<f64>,
    pub architecture: String,
    pub model_type: String,
    pub base_model: String,
    pub providers: Vec<String>,
    pub merged: bool,
    pub upload_date: String,
    pub submission_date: String,
    /// Merge generation (0 for original weights)
    pub generation: Option<i64>,
    pub pipeline_tag: String,
    pub readme: String,
}

impl ModelRecord {
    /// Create a record with only its id set
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Default::default()
        }
    }

    /// Providers joined for display and substring matching
    pub fn providers_joined(&self) -> String {
        self.providers.join(", ")
    }

    /// Tags joined for display
    pub fn tags_joined(&self) -> String {
        self.tags.join(", ")
    }
}

/// Snapshot object as exported by the leaderboard fetcher.
///
/// Field names mirror the export; values are kept as raw JSON because the
/// export mixes nulls, strings and numbers for the same key.
#[derive(Debug, Default, Deserialize)]
struct RawModelRecord {
    #[serde(default)]
    model_id: Option<Value>,
    #[serde(default)]
    fullname: Option<Value>,
    #[serde(default, rename = "Model")]
    model: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default, rename = "Hub License")]
    license: Option<Value>,
    #[serde(default, rename = "Hub ❤️")]
    likes: Option<Value>,
    #[serde(default, rename = "Average ⬆️")]
    average: Option<Value>,
    #[serde(default, rename = "BBH")]
    bbh: Option<Value>,
    #[serde(default, rename = "IFEval")]
    ifeval: Option<Value>,
    #[serde(default, rename = "MATH Lvl 5")]
    math_lvl5: Option<Value>,
    #[serde(default, rename = "GPQA")]
    gpqa: Option<Value>,
    #[serde(default, rename = "MMLU-PRO")]
    mmlu_pro: Option<Value>,
    #[serde(default, rename = "#Params (B)")]
    params: Option<Value>,
    #[serde(default, rename = "Architecture")]
    architecture: Option<Value>,
    #[serde(default, rename = "Type")]
    model_type: Option<Value>,
    #[serde(default, rename = "Base Model")]
    base_model: Option<Value>,
    #[serde(default, rename = "Official Providers")]
    providers: Option<Value>,
    #[serde(default, rename = "Merged")]
    merged: Option<Value>,
    #[serde(default, rename = "Upload To Hub Date")]
    upload_date: Option<Value>,
    #[serde(default, rename = "Submission Date")]
    submission_date: Option<Value>,
    #[serde(default, rename = "Generation")]
    generation: Option<Value>,
    #[serde(default)]
    pipeline_tag: Option<Value>,
    #[serde(default)]
    readme: Option<Value>,
}

impl From<RawModelRecord> for ModelRecord {
    fn from(raw: RawModelRecord) -> Self {
        let mut model_id = text(&raw.model_id);
        if model_id.is_empty() {
            model_id = text(&raw.fullname);
        }

        Self {
            model_id,
            display_name: text(&raw.model),
            description: text(&raw.description),
            summary: text(&raw.summary),
            tags: list(&raw.tags),
            license: text(&raw.license),
            likes: count(&raw.likes),
            score_average: number(&raw.average),
            benchmarks: Benchmarks {
                bbh: number(&raw.bbh),
                ifeval: number(&raw.ifeval),
                math_lvl5: number(&raw.math_lvl5),
                gpqa: number(&raw.gpqa),
                mmlu_pro: number(&raw.mmlu_pro),
            },
            param_count_billions: number(&raw.params),
            architecture: text(&raw.architecture),
            model_type: text(&raw.model_type),
            base_model: text(&raw.base_model),
            providers: list(&raw.providers),
            merged: flag(&raw.merged),
            upload_date: text(&raw.upload_date),
            submission_date: text(&raw.submission_date),
            generation: number(&raw.generation).map(|g| g as i64),
            pipeline_tag: text(&raw.pipeline_tag),
            readme: text(&raw.readme),
        }
    }
}

fn text(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn number(value: &Option<Value>) -> Option<f64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn count(value: &Option<Value>) -> u64 {
    number(value)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64)
        .unwrap_or(0)
}

fn flag(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn list(value: &Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text(&Some(item.clone())))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Read-only collection of model records loaded from a snapshot
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<ModelRecord>,
    by_id: HashMap<String, usize>,
    digest: String,
}

impl RecordStore {
    /// Load the snapshot file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            CatalogError::snapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let store = Self::from_json_bytes(&bytes)?;

        log::info!(
            "Loaded {} model records from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse a snapshot from its serialized bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: Vec<RawModelRecord> = serde_json::from_slice(bytes)?;
        let records = raw.into_iter().map(ModelRecord::from).collect();
        Ok(Self::build(records, sha256_hex(bytes)))
    }

    /// Build a store from already-normalized records.
    ///
    /// The digest is taken over the JSON serialization of the records.
    pub fn from_records(records: Vec<ModelRecord>) -> Result<Self> {
        let bytes = serde_json::to_vec(&records)?;
        Ok(Self::build(records, sha256_hex(&bytes)))
    }

    fn build(records: Vec<ModelRecord>, digest: String) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());

        for record in records {
            if record.model_id.is_empty() {
                log::warn!("Skipping snapshot record without model id");
                continue;
            }
            if by_id.contains_key(&record.model_id) {
                log::warn!("Duplicate model id {} in snapshot, keeping first", record.model_id);
                continue;
            }
            by_id.insert(record.model_id.clone(), kept.len());
            kept.push(record);
        }

        Self {
            records: kept,
            by_id,
            digest,
        }
    }

    /// Records in source order
    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }

    /// Get a record by exact id
    pub fn get(&self, model_id: &str) -> Option<&ModelRecord> {
        self.by_id.get(model_id).map(|&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hex SHA-256 of the snapshot content
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
