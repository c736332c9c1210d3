//! Document projection
//!
//! Renders a [`ModelRecord`] into the text blob that gets embedded, and into
//! the flat scalar metadata stored beside it. Field order is fixed and absent
//! values render as [`UNKNOWN`] so records missing different fields still
//! produce comparable documents.

use crate::record::{Benchmarks, ModelRecord};
use crate::storage::{Metadata, MetadataValue};

/// Placeholder for absent or empty values
pub const UNKNOWN: &str = "unknown";

/// Render a record as a single embedding document
pub fn project(record: &ModelRecord) -> String {
    let benchmarks = record
        .benchmarks
        .iter()
        .map(|(label, score)| format!("{} {}", label, or_unknown_num(score)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}. {}. Description: {}. Summary: {}. Tags: {}. Providers: {}. \
         Benchmarks: {}. Average Score: {}. License: {}. Likes: {}. Params: {}. \
         Type: {}. Architecture: {}. Base Model: {}.",
        or_unknown(&record.model_id),
        or_unknown(&record.display_name),
        or_unknown(&record.description),
        or_unknown(&record.summary),
        or_unknown(&record.tags_joined()),
        or_unknown(&record.providers_joined()),
        benchmarks,
        or_unknown_num(record.score_average),
        or_unknown(&record.license),
        record.likes,
        or_unknown_num(record.param_count_billions),
        or_unknown(&record.model_type),
        or_unknown(&record.architecture),
        or_unknown(&record.base_model),
    )
}

/// Flatten a record into scalar metadata; list fields are joined with ", "
pub fn to_metadata(record: &ModelRecord) -> Metadata {
    let mut meta = Metadata::new();
    let mut text = |key: &str, value: &str| {
        meta.insert(key.to_string(), MetadataValue::Text(value.to_string()));
    };

    text("model_id", &record.model_id);
    text("display_name", &record.display_name);
    text("description", &record.description);
    text("summary", &record.summary);
    text("tags", &record.tags_joined());
    text("license", &record.license);
    text("architecture", &record.architecture);
    text("model_type", &record.model_type);
    text("base_model", &record.base_model);
    text("providers", &record.providers_joined());
    text("upload_date", &record.upload_date);
    text("submission_date", &record.submission_date);
    text("pipeline_tag", &record.pipeline_tag);
    text("readme", &record.readme);

    meta.insert(
        "likes".to_string(),
        MetadataValue::Integer(i64::try_from(record.likes).unwrap_or(i64::MAX)),
    );
    meta.insert("merged".to_string(), MetadataValue::Bool(record.merged));
    meta.insert("score_average".to_string(), record.score_average.into());
    meta.insert(
        "param_count_billions".to_string(),
        record.param_count_billions.into(),
    );
    meta.insert(
        "generation".to_string(),
        record
            .generation
            .map(MetadataValue::Integer)
            .unwrap_or(MetadataValue::Null),
    );
    for (label, score) in record.benchmarks.iter() {
        meta.insert(label.to_string(), score.into());
    }

    meta
}

/// Rebuild a record from index metadata written by [`to_metadata`].
///
/// Used when a semantic hit refers to a model the loaded snapshot lacks.
pub fn from_metadata(meta: &Metadata) -> ModelRecord {
    let text = |key: &str| {
        meta.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let number = |key: &str| meta.get(key).and_then(|v| v.as_f64());
    let list = |key: &str| {
        text(key)
            .split(", ")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    ModelRecord {
        model_id: text("model_id"),
        display_name: text("display_name"),
        description: text("description"),
        summary: text("summary"),
        tags: list("tags"),
        license: text("license"),
        likes: match meta.get("likes") {
            Some(MetadataValue::Integer(n)) => u64::try_from(*n).unwrap_or(0),
            _ => 0,
        },
        score_average: number("score_average"),
        benchmarks: Benchmarks {
            bbh: number("BBH"),
            ifeval: number("IFEval"),
            math_lvl5: number("MATH Lvl 5"),
            gpqa: number("GPQA"),
            mmlu_pro: number("MMLU-PRO"),
        },
        param_count_billions: number("param_count_billions"),
        architecture: text("architecture"),
        model_type: text("model_type"),
        base_model: text("base_model"),
        providers: list("providers"),
        merged: matches!(meta.get("merged"), Some(MetadataValue::Bool(true))),
        upload_date: text("upload_date"),
        submission_date: text("submission_date"),
        generation: match meta.get("generation") {
            Some(MetadataValue::Integer(n)) => Some(*n),
            _ => None,
        },
        pipeline_tag: text("pipeline_tag"),
        readme: text("readme"),
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        UNKNOWN
    } else {
        value
    }
}

fn or_unknown_num(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
