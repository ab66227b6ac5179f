//! Vector store capability.
//!
//! [`VectorStore`] is the seam between the memory/knowledge layers and the
//! persistence engine. Records live in named collections that are created
//! lazily on first upsert; every collection has the embedder's fixed
//! dimensionality.
//!
//! Two adapters ship with the crate:
//! - [`InMemoryVectorStore`]: process-local, for tests and ephemeral runs
//! - [`SqliteVectorStore`]: a single SQLite file with brute-force cosine search

mod in_memory;
mod sqlite;

pub use in_memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use skein_llm::{Embedder, cosine_similarity};

use crate::error::Result;
use crate::types::{MemoryRecord, Metadata};
use crate::validation::{validate_collection, validate_embedding};

// ─────────────────────────────────────────────────────────────────────────────
// Metadata Filter
// ─────────────────────────────────────────────────────────────────────────────

/// Equality filter over record metadata. All entries must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    equals: BTreeMap<String, Value>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `metadata[key] == value`.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    /// Check a metadata map against the filter.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.equals
            .iter()
            .all(|(k, v)| metadata.get(k).is_some_and(|actual| actual == v))
    }
}

/// Shorthand for an optional filter check.
pub(crate) fn passes(filter: Option<&MetadataFilter>, metadata: &Metadata) -> bool {
    filter.is_none_or(|f| f.matches(metadata))
}

// ─────────────────────────────────────────────────────────────────────────────
// Vector Store Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Vector-store capability: upsert/search/get/remove by collection and key.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a record; returns its key.
    ///
    /// An empty key is replaced by a generated UUID. An empty embedding is
    /// computed from the record text.
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String>;

    /// Similarity search. Results carry `relevance`, are sorted by relevance
    /// descending (ties by key), drop anything below `min_relevance`, and omit
    /// embeddings.
    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<MemoryRecord>>;

    /// Fetch a record by key.
    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>>;

    /// Remove a record. Returns whether it existed.
    async fn remove(&self, collection: &str, key: &str) -> Result<bool>;

    /// All records in a collection matching `filter`, ordered by key.
    async fn list(
        &self,
        collection: &str,
        filter: Option<&MetadataFilter>,
        with_embedding: bool,
    ) -> Result<Vec<MemoryRecord>>;

    /// Names of collections that have been created.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Number of records matching `filter`.
    async fn count(&self, collection: &str, filter: Option<&MetadataFilter>) -> Result<usize> {
        Ok(self.list(collection, filter, false).await?.len())
    }

    /// Name of this store implementation.
    fn name(&self) -> &str;
}

/// A shared vector store.
pub type SharedVectorStore = Arc<dyn VectorStore>;

// ─────────────────────────────────────────────────────────────────────────────
// Shared Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Validate the collection, assign a key and make sure the record has a
/// well-formed embedding.
pub(crate) async fn prepare_record(
    embedder: &dyn Embedder,
    collection: &str,
    mut record: MemoryRecord,
) -> Result<MemoryRecord> {
    validate_collection(collection)?;

    if record.key.is_empty() {
        record.key = uuid::Uuid::new_v4().to_string();
    }

    if record.embedding.is_empty() {
        record.embedding = embedder.embed(&record.text).await?;
    }
    validate_embedding(&record.embedding, embedder.dimensions())?;

    record.relevance = None;
    Ok(record)
}

/// Score candidates against `query`, keep those at or above `min_relevance`,
/// sort descending (ties by key) and truncate to `limit`.
pub(crate) fn rank(
    candidates: impl IntoIterator<Item = MemoryRecord>,
    query: &[f32],
    limit: usize,
    min_relevance: f32,
) -> Vec<MemoryRecord> {
    let mut scored: Vec<MemoryRecord> = candidates
        .into_iter()
        .filter_map(|mut record| {
            let score = cosine_similarity(query, &record.embedding);
            if score < min_relevance {
                return None;
            }
            record.relevance = Some(score);
            record.embedding = Vec::new();
            Some(record)
        })
        .collect();

    scored.sort_by(|a, b| {
        let (ra, rb) = (a.relevance.unwrap_or(0.0), b.relevance.unwrap_or(0.0));
        rb.total_cmp(&ra).then_with(|| a.key.cmp(&b.key))
    });
    scored.truncate(limit);
    scored
}
