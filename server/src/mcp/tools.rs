//! MCP Tool Definitions
//!
//! Schemas for the four catalog tools exposed to agents.

use super::protocol::{PropertySchema, Tool, ToolInputSchema};
use crate::capabilities::MAX_TOP_K;
use modelfinder_catalog::DEFAULT_TOP_K;
use std::collections::BTreeMap;

pub const GET_MODEL_INFO: &str = "get_model_info";
pub const FILTER_MODELS: &str = "filter_models";
pub const SEMANTIC_MODEL_SEARCH: &str = "semantic_model_search";
pub const COMPARE_MODELS: &str = "compare_models";

/// Get all available catalog tools
pub fn get_all_tools() -> Vec<Tool> {
    vec![
        get_model_info_tool(),
        filter_models_tool(),
        semantic_model_search_tool(),
        compare_models_tool(),
    ]
}

fn object_schema(properties: BTreeMap<String, PropertySchema>, required: &[&str]) -> ToolInputSchema {
    ToolInputSchema {
        schema_type: "object".to_string(),
        properties,
        required: required.iter().map(|s| s.to_string()).collect(),
    }
}

fn get_model_info_tool() -> Tool {
    let mut properties = BTreeMap::new();
    properties.insert(
        "model_id".to_string(),
        PropertySchema::string(
            "Model id (e.g. 'google-bert/bert-base-uncased'). Partial ids are matched too.",
        ),
    );

    Tool {
        name: GET_MODEL_INFO.to_string(),
        description: Some("Get detailed information for a model: description, benchmarks, license, likes, parameters and providers. Falls back to semantic search when the id is not found.".to_string()),
        input_schema: object_schema(properties, &["model_id"]),
    }
}

fn filter_models_tool() -> Tool {
    let mut properties = BTreeMap::new();
    properties.insert(
        "tag".to_string(),
        PropertySchema::string("Keep models whose tags or type mention this text"),
    );
    properties.insert(
        "min_likes".to_string(),
        PropertySchema::integer("Minimum hub likes")
            .with_default(0)
            .with_range(0.0, None),
    );
    properties.insert(
        "task".to_string(),
        PropertySchema::string("Keep models whose type mentions this task"),
    );
    properties.insert(
        "min_score".to_string(),
        PropertySchema::number("Minimum leaderboard average score").with_default(0.0),
    );
    properties.insert(
        "license".to_string(),
        PropertySchema::string("Keep models whose license mentions this text"),
    );
    properties.insert(
        "provider".to_string(),
        PropertySchema::string("Keep models offered by this provider"),
    );
    properties.insert(
        "merged_only".to_string(),
        PropertySchema::boolean("Only merged models").with_default(false),
    );

    Tool {
        name: FILTER_MODELS.to_string(),
        description: Some("Filter models by tag, likes, task, score, license, provider or merged status. Returns up to 10 models; uses semantic search when no model matches.".to_string()),
        input_schema: object_schema(properties, &[]),
    }
}

fn semantic_model_search_tool() -> Tool {
    let mut properties = BTreeMap::new();
    properties.insert(
        "query".to_string(),
        PropertySchema::string("Natural language description of the model you need"),
    );
    properties.insert(
        "top_k".to_string(),
        PropertySchema::integer("Number of results to return")
            .with_default(DEFAULT_TOP_K as u64)
            .with_range(0.0, Some(MAX_TOP_K as f64)),
    );

    Tool {
        name: SEMANTIC_MODEL_SEARCH.to_string(),
        description: Some(
            "Find models by meaning using embedding similarity over the catalog.".to_string(),
        ),
        input_schema: object_schema(properties, &["query"]),
    }
}

fn compare_models_tool() -> Tool {
    let mut properties = BTreeMap::new();
    properties.insert(
        "model_id1".to_string(),
        PropertySchema::string("First model id"),
    );
    properties.insert(
        "model_id2".to_string(),
        PropertySchema::string("Second model id"),
    );

    Tool {
        name: COMPARE_MODELS.to_string(),
        description: Some("Show the details of two models one after the other.".to_string()),
        input_schema: object_schema(properties, &["model_id1", "model_id2"]),
    }
}
