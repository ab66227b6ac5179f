//! Process-local vector store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use skein_llm::SharedEmbedder;
use tracing::debug;

use super::{MetadataFilter, VectorStore, passes, prepare_record, rank};
use crate::error::Result;
use crate::types::MemoryRecord;

type Collection = BTreeMap<String, MemoryRecord>;

/// Vector store that keeps every collection in a `BTreeMap` behind a lock.
pub struct InMemoryVectorStore {
    embedder: SharedEmbedder,
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: SharedEmbedder) -> Self {
        Self {
            embedder,
            collections: RwLock::new(BTreeMap::new()),
        }
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("embedder", &self.embedder.name())
            .field("collections", &self.collections.read().len())
            .finish()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String> {
        let record = prepare_record(self.embedder.as_ref(), collection, record).await?;
        let key = record.key.clone();

        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(key.clone(), record);

        debug!(collection, key = %key, "Upserted record");
        Ok(key)
    }

    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<MemoryRecord>> {
        let query = self.embedder.embed(query).await?;

        let candidates: Vec<MemoryRecord> = match self.collections.read().get(collection) {
            Some(records) => records
                .values()
                .filter(|r| passes(filter, &r.metadata))
                .cloned()
                .collect(),
            None => return Ok(Vec::new()),
        };

        Ok(rank(candidates, &query, limit, min_relevance))
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>> {
        let record = self
            .collections
            .read()
            .get(collection)
            .and_then(|records| records.get(key))
            .cloned();

        Ok(record.map(|mut r| {
            if !with_embedding {
                r.embedding = Vec::new();
            }
            r
        }))
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<bool> {
        let removed = self
            .collections
            .write()
            .get_mut(collection)
            .is_some_and(|records| records.remove(key).is_some());
        Ok(removed)
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&MetadataFilter>,
        with_embedding: bool,
    ) -> Result<Vec<MemoryRecord>> {
        let collections = self.collections.read();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(records
            .values()
            .filter(|r| passes(filter, &r.metadata))
            .map(|r| {
                let mut r = r.clone();
                if !with_embedding {
                    r.embedding = Vec::new();
                }
                r
            })
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.read().keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;
    use skein_llm::HashEmbedder;
    use std::sync::Arc;

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(HashEmbedder::new(64)))
    }

    #[tokio::test]
    async fn test_upsert_get_remove() {
        let store = store();
        let key = store
            .upsert("notes", MemoryRecord::new("k1", "rust borrow checker"))
            .await
            .unwrap();
        assert_eq!(key, "k1");

        let fetched = store.get("notes", "k1", false).await.unwrap().unwrap();
        assert_eq!(fetched.text, "rust borrow checker");
        assert!(fetched.embedding.is_empty());

        let with_emb = store.get("notes", "k1", true).await.unwrap().unwrap();
        assert_eq!(with_emb.embedding.len(), 64);

        assert!(store.remove("notes", "k1").await.unwrap());
        assert!(!store.remove("notes", "k1").await.unwrap());
        assert!(store.get("notes", "k1", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generated_key_and_lazy_collection() {
        let store = store();
        assert!(store.list_collections().await.unwrap().is_empty());
        let key = store
            .upsert("fresh", MemoryRecord::from_text("hello"))
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(&key).is_ok());
        assert_eq!(store.list_collections().await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_reupsert_replaces() {
        let store = store();
        store
            .upsert("c", MemoryRecord::new("k", "first").with_metadata("v", 1))
            .await
            .unwrap();
        store
            .upsert("c", MemoryRecord::new("k", "second"))
            .await
            .unwrap();
        let r = store.get("c", "k", false).await.unwrap().unwrap();
        assert_eq!(r.text, "second");
        assert!(r.metadata.get("v").is_none());
        assert_eq!(store.count("c", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_with_filter() {
        let store = store();
        store
            .upsert(
                "c",
                MemoryRecord::new("a", "vector search engines").with_metadata("tier", "x"),
            )
            .await
            .unwrap();
        store
            .upsert(
                "c",
                MemoryRecord::new("b", "vector search engines").with_metadata("tier", "y"),
            )
            .await
            .unwrap();

        let all = store
            .search("c", "vector search engines", 10, 0.5, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!((all[0].relevance.unwrap() - 1.0).abs() < 1e-5);

        let filter = MetadataFilter::new().eq("tier", "y");
        let only_y = store
            .search("c", "vector search engines", 10, 0.5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(only_y.len(), 1);
        assert_eq!(only_y[0].key, "b");
    }

    #[tokio::test]
    async fn test_search_missing_collection_is_empty() {
        let store = store();
        assert!(store.search("none", "q", 5, 0.0, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = store();
        let err = store
            .upsert("c", MemoryRecord::new("k", "t").with_embedding(vec![1.0, 2.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_empty_collection_name_rejected() {
        let store = store();
        let err = store
            .upsert("", MemoryRecord::new("k", "t"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
