//! Attribute filtering over the record store
//!
//! All supplied criteria are ANDed; unset criteria match everything. When
//! nothing matches, the first non-empty text criterion is retried as a
//! semantic query.

use serde::{Deserialize, Deserializer};

use crate::record::{ModelRecord, RecordStore};
use crate::search::{SearchHit, SemanticSource};

/// Maximum records returned; the rest are reported as a count
pub const FILTER_LIMIT: usize = 10;

/// Filter criteria; defaults are no-ops.
///
/// Explicit `null`s deserialize to the default and `min_likes` accepts
/// whole-number floats such as `1000.0`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Fuzzy containment in tags or model type
    #[serde(deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(deserialize_with = "whole_count")]
    pub min_likes: u64,
    /// Substring of the model type
    #[serde(deserialize_with = "null_as_default")]
    pub task: String,
    /// Minimum average score; 0 disables the check
    #[serde(deserialize_with = "null_as_default")]
    pub min_score: f64,
    /// Substring of the license
    #[serde(deserialize_with = "null_as_default")]
    pub license: String,
    /// Substring of the joined providers
    #[serde(deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(deserialize_with = "null_as_default")]
    pub merged_only: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn whole_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(0),
        Some(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 => Ok(n as u64),
        Some(n) => Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            n
        ))),
    }
}

impl FilterCriteria {
    /// Whether `record` satisfies every supplied criterion
    pub fn matches(&self, record: &ModelRecord) -> bool {
        if let Some(tag) = given(&self.tag) {
            let candidates = record
                .tags
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(record.model_type.as_str()));
            if !fuzzy_in(tag, candidates) {
                return false;
            }
        }
        if record.likes < self.min_likes {
            return false;
        }
        if given(&self.task).is_some_and(|task| !contains_ci(&record.model_type, task)) {
            return false;
        }
        if self.min_score > 0.0 && !record.score_average.is_some_and(|s| s >= self.min_score) {
            return false;
        }
        if given(&self.license).is_some_and(|license| !contains_ci(&record.license, license)) {
            return false;
        }
        if given(&self.provider)
            .is_some_and(|provider| !contains_ci(&record.providers_joined(), provider))
        {
            return false;
        }
        if self.merged_only && !record.merged {
            return false;
        }
        true
    }

    /// Free text used for the semantic fallback: first non-empty of
    /// tag, task, provider, license
    pub fn fallback_query(&self) -> Option<&str> {
        [&self.tag, &self.task, &self.provider, &self.license]
            .into_iter()
            .find_map(|s| given(s))
    }
}

/// Result of a filter run
#[derive(Debug, Clone)]
pub enum FilterOutcome<'s> {
    /// Deterministic matches in source order, capped, plus how many were cut
    Matches {
        records: Vec<&'s ModelRecord>,
        remaining: usize,
    },
    /// Nothing matched; semantic results for the fallback query
    SemanticFallback {
        query: String,
        hits: Vec<SearchHit>,
        remaining: usize,
    },
    /// Nothing matched and there was no text to fall back on
    NoMatch,
    /// Nothing matched, including the semantic fallback
    NoSemanticMatch { query: String },
}

/// Run `criteria` over `store`, falling back to `source` on zero matches
pub fn filter<'s>(
    store: &'s RecordStore,
    criteria: &FilterCriteria,
    source: &dyn SemanticSource,
) -> FilterOutcome<'s> {
    let matches: Vec<&ModelRecord> = store
        .records()
        .iter()
        .filter(|r| criteria.matches(r))
        .collect();

    if !matches.is_empty() {
        let remaining = matches.len().saturating_sub(FILTER_LIMIT);
        let records = matches.into_iter().take(FILTER_LIMIT).collect();
        return FilterOutcome::Matches { records, remaining };
    }

    let Some(query) = criteria.fallback_query() else {
        return FilterOutcome::NoMatch;
    };

    log::debug!("No filter matches; semantic fallback with '{}'", query);

    let hits = match source.search(query, FILTER_LIMIT) {
        Ok(hits) => hits,
        Err(e) => {
            log::warn!("Semantic fallback for '{}' failed: {}", query, e);
            Vec::new()
        }
    };

    if hits.is_empty() {
        return FilterOutcome::NoSemanticMatch {
            query: query.to_string(),
        };
    }

    let remaining = hits.len().saturating_sub(FILTER_LIMIT);
    FilterOutcome::SemanticFallback {
        query: query.to_string(),
        hits: hits.into_iter().take(FILTER_LIMIT).collect(),
        remaining,
    }
}

/// Case-insensitive substring test against any candidate
pub fn fuzzy_in<'a>(needle: &str, haystack: impl IntoIterator<Item = &'a str>) -> bool {
    let needle = needle.to_lowercase();
    haystack
        .into_iter()
        .any(|item| item.to_lowercase().contains(&needle))
}

/// Trimmed text criterion, `None` when blank
fn given(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
