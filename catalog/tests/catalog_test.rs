//! End-to-end tests for the catalog service with the offline embedder

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use modelfinder_catalog::{
    CatalogConfig, EmbeddingConfig, FilterCriteria, FilterOutcome, HashingEmbedder, LookupOutcome,
    MatchKind, ModelCatalog, ModelRecord, RebuildOutcome, RecordStore,
};

const SNAPSHOT: &str = r#"[
    {
        "fullname": "google-bert/bert-base-uncased",
        "model_id": "google-bert/bert-base-uncased",
        "Model": "bert-base-uncased",
        "description": "English masked language model",
        "Type": "pretrained",
        "Hub ❤️": 2100,
        "Hub License": "apache-2.0",
        "tags": ["fill-mask", "en"]
    },
    {
        "fullname": "google-bert/bert-large-uncased",
        "model_id": "google-bert/bert-large-uncased",
        "Model": "bert-large-uncased",
        "description": "Larger English masked language model",
        "Type": "pretrained",
        "Hub ❤️": 150,
        "Hub License": "apache-2.0"
    },
    {
        "fullname": "deepset/xlm-roberta-large-squad2",
        "model_id": "deepset/xlm-roberta-large-squad2",
        "Model": "xlm-roberta-large-squad2",
        "description": "Multilingual extractive question answering",
        "Type": "fine-tuned",
        "Hub ❤️": 400,
        "Official Providers": ["deepset"],
        "Average ⬆️": 18.2
    }
]"#;

fn config(dir: &Path) -> CatalogConfig {
    CatalogConfig::from_data_dir(dir).with_embedding(EmbeddingConfig::Offline { dimension: 128 })
}

fn write_snapshot(dir: &Path, content: &str) {
    std::fs::write(dir.join("model_metadata.json"), content).unwrap();
}

#[test]
fn test_first_open_rebuilds_then_reuses() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);

    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    assert_eq!(
        catalog.ensure_consistent().unwrap(),
        RebuildOutcome::Rebuilt {
            deleted: 0,
            inserted: 3
        }
    );
    assert_eq!(catalog.ensure_consistent().unwrap(), RebuildOutcome::UpToDate);
    catalog.close().unwrap();

    // Index and fingerprint persist across restarts
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    assert_eq!(catalog.ensure_consistent().unwrap(), RebuildOutcome::UpToDate);
    assert_eq!(catalog.search("question answering", 3).unwrap().len(), 3);
    catalog.close().unwrap();
}

#[test]
fn test_snapshot_change_rebuilds_on_next_start() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    catalog.ensure_consistent().unwrap();
    catalog.close().unwrap();

    write_snapshot(
        dir.path(),
        r#"[{"fullname": "mistralai/Mistral-7B-v0.1", "Type": "pretrained"}]"#,
    );
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    assert_eq!(
        catalog.ensure_consistent().unwrap(),
        RebuildOutcome::Rebuilt {
            deleted: 3,
            inserted: 1
        }
    );
    let hits = catalog.search("mistral", 3).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].model_id(), "mistralai/Mistral-7B-v0.1");
}

#[test]
fn test_lookup_exact_over_similar() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    catalog.ensure_consistent().unwrap();

    match catalog.lookup("google-bert/bert-base-uncased") {
        LookupOutcome::Found { record, kind } => {
            assert_eq!(record.model_id, "google-bert/bert-base-uncased");
            assert_eq!(kind, MatchKind::Exact);
        }
        LookupOutcome::NotFound => panic!("expected exact match"),
    }

    match catalog.lookup("BERT-LARGE") {
        LookupOutcome::Found { record, kind } => {
            assert_eq!(record.model_id, "google-bert/bert-large-uncased");
            assert_eq!(kind, MatchKind::Substring);
        }
        LookupOutcome::NotFound => panic!("expected substring match"),
    }

    assert_eq!(catalog.lookup("gpt-j"), LookupOutcome::NotFound);
}

#[test]
fn test_stale_index_answers_lookup_from_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    catalog.ensure_consistent().unwrap();
    catalog.close().unwrap();

    // Index still holds the old snapshot; the store only has one new model
    let store = RecordStore::from_records(vec![ModelRecord::new("mistralai/Mistral-7B-v0.1")])
        .unwrap();
    let catalog = ModelCatalog::with_store(
        config(dir.path()),
        store,
        Arc::new(HashingEmbedder::new(128)),
    )
    .unwrap();

    match catalog.lookup("xlm-roberta-large") {
        LookupOutcome::Found { record, kind } => {
            assert_eq!(kind, MatchKind::Semantic);
            assert!(matches!(record, Cow::Owned(_)));
            assert_eq!(record.model_id, "deepset/xlm-roberta-large-squad2");
            assert_eq!(record.providers, vec!["deepset".to_string()]);
            assert_eq!(record.likes, 400);
        }
        LookupOutcome::NotFound => panic!("expected semantic match from the stale index"),
    }
}

#[test]
fn test_search_ranks_relevant_first() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    catalog.ensure_consistent().unwrap();

    let hits = catalog
        .search("multilingual extractive question answering", 2)
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].model_id(), "deepset/xlm-roberta-large-squad2");
    assert!(hits[0].document.contains("Providers: deepset"));
}

#[test]
fn test_filter_and_semantic_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();
    catalog.ensure_consistent().unwrap();

    let criteria = FilterCriteria {
        min_likes: 200,
        license: "apache".into(),
        ..Default::default()
    };
    match catalog.filter(&criteria) {
        FilterOutcome::Matches { records, remaining } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].model_id, "google-bert/bert-base-uncased");
            assert_eq!(remaining, 0);
        }
        other => panic!("expected matches, got {:?}", other),
    }

    let criteria = FilterCriteria {
        task: "question answering".into(),
        ..Default::default()
    };
    match catalog.filter(&criteria) {
        FilterOutcome::SemanticFallback { query, hits, .. } => {
            assert_eq!(query, "question answering");
            assert_eq!(hits[0].model_id(), "deepset/xlm-roberta-large-squad2");
        }
        other => panic!("expected semantic fallback, got {:?}", other),
    }
}

#[test]
fn test_stats_report_committed_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), SNAPSHOT);
    let catalog = ModelCatalog::open(config(dir.path())).unwrap();

    let before = catalog.stats().unwrap();
    assert!(before["committedFingerprint"].is_null());

    catalog.ensure_consistent().unwrap();
    let after = catalog.stats().unwrap();
    assert_eq!(after["records"], 3);
    assert_eq!(after["embeddingModel"], "hashing-128");
    assert_eq!(after["index"]["entries"], 3);
    assert!(after["committedFingerprint"].is_string());
}

#[test]
fn test_missing_snapshot_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ModelCatalog::open(config(dir.path())).is_err());
}
