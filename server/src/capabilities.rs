//! Agent-facing capabilities
//!
//! The four catalog operations an LLM agent can call. Every operation takes
//! plain values and returns plain text; failures are rendered as messages,
//! never raised to the caller.

use std::sync::Arc;

use modelfinder_catalog::{
    FilterCriteria, FilterOutcome, LookupOutcome, MatchKind, ModelCatalog, ModelRecord, SearchHit,
};

/// Prefix added when a model was only found through semantic search
const SEMANTIC_NOTICE: &str = "(No exact match found. Showing closest model by semantic search.)";

/// Characters of description shown per filter row
const FILTER_SNIPPET: usize = 80;
/// Characters of description shown per semantic match
const SEARCH_SNIPPET: usize = 200;

/// Upper bound on `top_k` accepted from callers
pub const MAX_TOP_K: usize = 50;

/// Text capabilities over a shared catalog
#[derive(Clone)]
pub struct CatalogTools {
    catalog: Arc<ModelCatalog>,
}

impl CatalogTools {
    pub fn new(catalog: Arc<ModelCatalog>) -> Self {
        Self { catalog }
    }

    /// Detailed info for one model, by exact id, id substring, or confirmed
    /// semantic match
    pub fn get_model_info(&self, model_id: &str) -> String {
        match self.catalog.lookup(model_id) {
            LookupOutcome::Found { record, kind } => {
                let details = render_record(&record);
                if kind == MatchKind::Semantic {
                    format!("{}\n{}", SEMANTIC_NOTICE, details)
                } else {
                    details
                }
            }
            LookupOutcome::NotFound => format!("No model found with id {}.", model_id),
        }
    }

    /// Attribute filter with semantic fallback
    pub fn filter_models(&self, criteria: &FilterCriteria) -> String {
        match self.catalog.filter(criteria) {
            FilterOutcome::Matches { records, remaining } => {
                let mut result = String::from("Filtered Models:\n");
                for record in records {
                    let likes = record.likes.to_string();
                    result.push_str(&filter_row(
                        &record.model_id,
                        record_blurb(record),
                        &score_or_unknown(record.score_average),
                        &likes,
                    ));
                }
                push_remaining(&mut result, remaining);
                result
            }
            FilterOutcome::SemanticFallback {
                hits, remaining, ..
            } => {
                let mut result = String::from("Semantic Fallback Results:\n");
                for hit in &hits {
                    result.push_str(&filter_row(
                        hit.model_id(),
                        hit_blurb(hit),
                        &metadata_or_unknown(hit, "score_average"),
                        &metadata_or_unknown(hit, "likes"),
                    ));
                }
                push_remaining(&mut result, remaining);
                result
            }
            FilterOutcome::NoMatch => "No models found with those filters.".to_string(),
            FilterOutcome::NoSemanticMatch { .. } => {
                "No models found with those filters, even with semantic search.".to_string()
            }
        }
    }

    /// Free-text semantic search returning the `top_k` closest models
    pub fn semantic_model_search(&self, query: &str, top_k: usize) -> String {
        let hits = match self.catalog.search(query, top_k.min(MAX_TOP_K)) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Semantic search for '{}' failed: {}", query, e);
                return format!("Semantic search is unavailable: {}", e);
            }
        };

        if hits.is_empty() {
            return "No relevant models found.".to_string();
        }

        let mut result = String::from("Top Semantic Matches:\n");
        for hit in &hits {
            let providers = non_empty(hit.text("providers")).unwrap_or("N/A");
            let params = hit
                .metadata
                .get("param_count_billions")
                .and_then(|v| v.as_f64())
                .map(|p| format!("{}B", p))
                .unwrap_or_else(|| "unknown".to_string());

            result.push_str(&format!(
                "Model: {}\nProvider(s): {}\nType: {}, Params: {}\nAverage Score: {}\nLicense: {}\nDescription: {}...\n-----\n",
                hit.model_id(),
                providers,
                hit.text("model_type"),
                params,
                metadata_or_unknown(hit, "score_average"),
                hit.text("license"),
                truncate_chars(hit_blurb(hit), SEARCH_SNIPPET),
            ));
        }
        result
    }

    /// Side-by-side info for two models
    pub fn compare_models(&self, model_id1: &str, model_id2: &str) -> String {
        let info1 = self.get_model_info(model_id1);
        let info2 = self.get_model_info(model_id2);
        format!(
            "Model 1: {}\n{}\n\nModel 2: {}\n{}",
            model_id1, info1, model_id2, info2
        )
    }
}

/// Detail view; empty and `N/A` fields are left out
fn render_record(record: &ModelRecord) -> String {
    let benchmarks = record
        .benchmarks
        .iter()
        .map(|(label, score)| format!("{}: {}", label, score_or_unknown(score)))
        .collect::<Vec<_>>()
        .join(", ");

    let fields: [(&str, String); 18] = [
        ("Model", record.model_id.clone()),
        ("Description", record.description.clone()),
        ("Summary", record.summary.clone()),
        ("Provider(s)", record.providers_joined()),
        ("Average Score", opt_num(record.score_average)),
        ("Benchmarks", benchmarks),
        ("License", record.license.clone()),
        ("Likes", non_zero(record.likes)),
        ("#Params (B)", opt_num(record.param_count_billions)),
        ("Architecture", record.architecture.clone()),
        ("Type", record.model_type.clone()),
        ("Base Model", record.base_model.clone()),
        ("Merged", if record.merged { "true".into() } else { String::new() }),
        ("Generation", record.generation.map(|g| g.to_string()).unwrap_or_default()),
        ("Pipeline", record.pipeline_tag.clone()),
        ("Upload Date", record.upload_date.clone()),
        ("Submission Date", record.submission_date.clone()),
        ("Tags", record.tags_joined()),
    ];

    fields
        .iter()
        .filter(|(_, value)| !value.is_empty() && value != "N/A")
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn filter_row(model_id: &str, blurb: &str, score: &str, likes: &str) -> String {
    format!(
        "- {}: {}... (Score: {}, Likes: {})\n",
        model_id,
        truncate_chars(blurb, FILTER_SNIPPET),
        score,
        likes
    )
}

fn push_remaining(result: &mut String, remaining: usize) {
    if remaining > 0 {
        result.push_str(&format!("...and {} more.", remaining));
    }
}

fn record_blurb(record: &ModelRecord) -> &str {
    non_empty(&record.description).unwrap_or(&record.summary)
}

fn hit_blurb(hit: &SearchHit) -> &str {
    non_empty(hit.text("description")).unwrap_or(hit.text("summary"))
}

fn metadata_or_unknown(hit: &SearchHit, key: &str) -> String {
    hit.metadata
        .get(key)
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn score_or_unknown(score: Option<f64>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string())
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn non_zero(value: u64) -> String {
    if value == 0 {
        String::new()
    } else {
        value.to_string()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
