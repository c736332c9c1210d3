//! Model lookup by id or fuzzy text
//!
//! Lookup runs an ordered chain of strategies; the first one that finds a
//! record wins. The default chain is exact id, then case-insensitive id
//! substring, then a semantic search whose hit is only accepted when the
//! query text is part of the hit's id. A semantic hit is answered from the
//! metadata stored in the index, so an index built from an older snapshot
//! can still resolve ids the current store no longer has.

use std::borrow::Cow;

use crate::projector::from_metadata;
use crate::record::{ModelRecord, RecordStore};
use crate::search::SemanticSource;

/// Semantic candidates considered by [`SemanticConfirmed`]
const SEMANTIC_CANDIDATES: usize = 3;

/// Which strategy produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
    Semantic,
}

/// Result of a lookup
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<'s> {
    Found {
        /// Borrowed from the store, or rebuilt from index metadata
        record: Cow<'s, ModelRecord>,
        kind: MatchKind,
    },
    NotFound,
}

impl LookupOutcome<'_> {
    pub fn record(&self) -> Option<&ModelRecord> {
        match self {
            Self::Found { record, .. } => Some(record),
            Self::NotFound => None,
        }
    }
}

/// One way of resolving a query to a record
pub trait LookupStrategy {
    fn kind(&self) -> MatchKind;

    fn resolve<'s>(&self, store: &'s RecordStore, query: &str) -> Option<Cow<'s, ModelRecord>>;
}

/// Exact `model_id` match
pub struct ExactId;

impl LookupStrategy for ExactId {
    fn kind(&self) -> MatchKind {
        MatchKind::Exact
    }

    fn resolve<'s>(&self, store: &'s RecordStore, query: &str) -> Option<Cow<'s, ModelRecord>> {
        store.get(query).map(Cow::Borrowed)
    }
}

/// First record (source order) whose id contains the query, ignoring case
pub struct IdSubstring;

impl LookupStrategy for IdSubstring {
    fn kind(&self) -> MatchKind {
        MatchKind::Substring
    }

    fn resolve<'s>(&self, store: &'s RecordStore, query: &str) -> Option<Cow<'s, ModelRecord>> {
        let needle = query.to_lowercase();
        store
            .records()
            .iter()
            .find(|r| r.model_id.to_lowercase().contains(&needle))
            .map(Cow::Borrowed)
    }
}

/// Semantic search, accepted only when the hit's id contains the query
pub struct SemanticConfirmed<'a> {
    source: &'a dyn SemanticSource,
}

impl<'a> SemanticConfirmed<'a> {
    pub fn new(source: &'a dyn SemanticSource) -> Self {
        Self { source }
    }
}

impl LookupStrategy for SemanticConfirmed<'_> {
    fn kind(&self) -> MatchKind {
        MatchKind::Semantic
    }

    fn resolve<'s>(&self, store: &'s RecordStore, query: &str) -> Option<Cow<'s, ModelRecord>> {
        let hits = match self.source.search(query, SEMANTIC_CANDIDATES) {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("Semantic lookup for '{}' failed: {}", query, e);
                return None;
            }
        };

        let needle = query.to_lowercase();
        let hit = hits
            .iter()
            .find(|hit| hit.model_id().to_lowercase().contains(&needle))?;
        match store.get(hit.model_id()) {
            Some(record) => Some(Cow::Borrowed(record)),
            None => Some(Cow::Owned(from_metadata(&hit.metadata))),
        }
    }
}

/// Ordered strategy chain
pub struct Lookup<'a> {
    strategies: Vec<Box<dyn LookupStrategy + 'a>>,
}

impl<'a> Lookup<'a> {
    /// Exact → substring → confirmed semantic
    pub fn standard(source: &'a dyn SemanticSource) -> Self {
        Self {
            strategies: vec![
                Box::new(ExactId),
                Box::new(IdSubstring),
                Box::new(SemanticConfirmed::new(source)),
            ],
        }
    }

    /// Chain with caller-chosen strategies
    pub fn with_strategies(strategies: Vec<Box<dyn LookupStrategy + 'a>>) -> Self {
        Self { strategies }
    }

    pub fn lookup<'s>(&self, store: &'s RecordStore, query: &str) -> LookupOutcome<'s> {
        let query = query.trim();
        if query.is_empty() {
            return LookupOutcome::NotFound;
        }

        for strategy in &self.strategies {
            if let Some(record) = strategy.resolve(store, query) {
                log::debug!("Lookup '{}' matched {} via {:?}", query, record.model_id, strategy.kind());
                return LookupOutcome::Found {
                    record,
                    kind: strategy.kind(),
                };
            }
        }

        LookupOutcome::NotFound
    }
}
