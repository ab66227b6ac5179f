//! Dual-tier memory store.
//!
//! Short-term and long-term memories share a vector collection and are told
//! apart by the `memory_type` metadata tag. Short-term records carry a TTL
//! and disappear from reads once it elapses; expired records found on a read
//! are deleted on the spot.
//!
//! Those read-time deletes are best-effort in `get_memory` and `search_memory`
//! alike: the read already treats the record as absent, so a failed delete is
//! logged at `warn!` and the read succeeds. `purge_expired` is the explicit
//! cleanup and returns delete failures.
//!
//! Operations are split across submodules:
//! - `memory_ops`: save, get, remove, collections
//! - `recall`: merged tier search, stats, purge

mod memory_ops;
mod recall;

use std::sync::Arc;

use crate::ttl::{DEFAULT_TTL_SECS, SharedClock, SystemClock};
use crate::vector::SharedVectorStore;

pub use recall::MemoryStats;

/// Tiered memory over a [`VectorStore`](crate::vector::VectorStore).
pub struct MemoryStore {
    pub(crate) vectors: SharedVectorStore,
    pub(crate) clock: SharedClock,
    pub(crate) default_ttl_secs: u64,
}

impl MemoryStore {
    /// Create a memory store over the given vector store.
    pub fn new(vectors: SharedVectorStore) -> Self {
        Self {
            vectors,
            clock: Arc::new(SystemClock),
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    /// Override the default short-term TTL.
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl_secs = ttl_secs;
        self
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying vector store.
    pub fn vectors(&self) -> &SharedVectorStore {
        &self.vectors
    }

    /// Default short-term TTL in seconds.
    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("vectors", &self.vectors.name())
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::error::{MemoryError, Result};
    use crate::ttl::Clock;
    use crate::types::MemoryRecord;
    use crate::vector::{InMemoryVectorStore, MetadataFilter, VectorStore};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use skein_llm::HashEmbedder;

    /// A clock tests can move forward.
    pub struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(
                Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            )))
        }

        pub fn advance(&self, secs: i64) {
            *self.0.lock() += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    pub fn store_with_clock() -> (MemoryStore, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let vectors = Arc::new(InMemoryVectorStore::new(Arc::new(HashEmbedder::new(64))));
        let store = MemoryStore::new(vectors).with_clock(clock.clone());
        (store, clock)
    }

    /// In-memory store whose deletes can be switched to fail.
    pub struct FlakyRemoveStore {
        inner: InMemoryVectorStore,
        pub fail_removes: AtomicBool,
    }

    #[async_trait]
    impl VectorStore for FlakyRemoveStore {
        async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String> {
            self.inner.upsert(collection, record).await
        }

        async fn search(
            &self,
            collection: &str,
            query: &str,
            limit: usize,
            min_relevance: f32,
            filter: Option<&MetadataFilter>,
        ) -> Result<Vec<MemoryRecord>> {
            self.inner
                .search(collection, query, limit, min_relevance, filter)
                .await
        }

        async fn get(
            &self,
            collection: &str,
            key: &str,
            with_embedding: bool,
        ) -> Result<Option<MemoryRecord>> {
            self.inner.get(collection, key, with_embedding).await
        }

        async fn remove(&self, collection: &str, key: &str) -> Result<bool> {
            if self.fail_removes.load(Ordering::SeqCst) {
                return Err(MemoryError::capability("remove", "store is read-only"));
            }
            self.inner.remove(collection, key).await
        }

        async fn list(
            &self,
            collection: &str,
            filter: Option<&MetadataFilter>,
            with_embedding: bool,
        ) -> Result<Vec<MemoryRecord>> {
            self.inner.list(collection, filter, with_embedding).await
        }

        async fn list_collections(&self) -> Result<Vec<String>> {
            self.inner.list_collections().await
        }

        fn name(&self) -> &str {
            "flaky-remove"
        }
    }

    pub fn flaky_store_with_clock() -> (MemoryStore, Arc<ManualClock>, Arc<FlakyRemoveStore>) {
        let clock = ManualClock::new();
        let vectors = Arc::new(FlakyRemoveStore {
            inner: InMemoryVectorStore::new(Arc::new(HashEmbedder::new(64))),
            fail_removes: AtomicBool::new(false),
        });
        let store = MemoryStore::new(vectors.clone()).with_clock(clock.clone());
        (store, clock, vectors)
    }
}
