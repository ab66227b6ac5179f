//! Save, get and remove operations for tiered memories.

use tracing::{debug, error, warn};

use super::MemoryStore;
use crate::error::Result;
use crate::ttl::{is_expired, stamp_long_term, stamp_short_term};
use crate::types::{MemoryRecord, MemoryTier};

impl MemoryStore {
    /// Save a short-term memory. `ttl_secs` defaults to the store's TTL.
    ///
    /// Returns the record key (generated when the record has none).
    pub async fn save_short_term_memory(
        &self,
        collection: &str,
        mut record: MemoryRecord,
        ttl_secs: Option<u64>,
    ) -> Result<String> {
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        stamp_short_term(&mut record.metadata, ttl, self.clock.now())?;

        let key = self.vectors.upsert(collection, record).await.map_err(|e| {
            error!(collection, error = %e, "Failed to save short-term memory");
            e.context("save_short_term_memory")
        })?;

        debug!(collection, key = %key, ttl, "Saved short-term memory");
        Ok(key)
    }

    /// Save a long-term memory. Returns the record key.
    pub async fn save_long_term_memory(
        &self,
        collection: &str,
        mut record: MemoryRecord,
    ) -> Result<String> {
        stamp_long_term(&mut record.metadata, self.clock.now());

        let key = self.vectors.upsert(collection, record).await.map_err(|e| {
            error!(collection, error = %e, "Failed to save long-term memory");
            e.context("save_long_term_memory")
        })?;

        debug!(collection, key = %key, "Saved long-term memory");
        Ok(key)
    }

    /// Fetch a memory by key, short-term tier first, then long-term.
    ///
    /// An expired short-term record is deleted and reported as absent.
    pub async fn get_memory(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>> {
        let record = self
            .vectors
            .get(collection, key, with_embedding)
            .await
            .map_err(|e| {
                error!(collection, key, error = %e, "Failed to get memory");
                e.context("get_memory")
            })?;

        let Some(record) = record else {
            return Ok(None);
        };

        match record.tier() {
            Some(MemoryTier::ShortTerm) if is_expired(&record.metadata, self.clock.now()) => {
                debug!(collection, key, "Short-term memory expired");
                self.discard_expired(collection, key).await;
                Ok(None)
            }
            Some(_) => Ok(Some(record)),
            // Untagged records were not written through this store.
            None => Ok(None),
        }
    }

    /// Remove a memory from both tiers. Removing a missing key is not an error.
    pub async fn remove_memory(&self, collection: &str, key: &str) -> Result<()> {
        let existed = self.vectors.remove(collection, key).await.map_err(|e| {
            error!(collection, key, error = %e, "Failed to remove memory");
            e.context("remove_memory")
        })?;
        debug!(collection, key, existed, "Removed memory");
        Ok(())
    }

    /// Known collection names.
    pub async fn get_collections(&self) -> Result<Vec<String>> {
        self.vectors.list_collections().await.map_err(|e| {
            error!(error = %e, "Failed to list collections");
            e.context("get_collections")
        })
    }

    /// Best-effort delete of an expired record; the read already treats it as absent.
    pub(crate) async fn discard_expired(&self, collection: &str, key: &str) {
        if let Err(e) = self.vectors.remove(collection, key).await {
            warn!(collection, key, error = %e, "Failed to delete expired memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::store_with_clock;
    use crate::types::{META_MEMORY_TYPE, META_TTL, MemoryRecord, MemoryTier};

    #[tokio::test]
    async fn test_short_term_save_then_get() {
        let (store, _clock) = store_with_clock();
        let key = store
            .save_short_term_memory("mem", MemoryRecord::new("k1", "remember this"), None)
            .await
            .unwrap();
        assert_eq!(key, "k1");

        let record = store.get_memory("mem", "k1", false).await.unwrap().unwrap();
        assert_eq!(record.text, "remember this");
        assert_eq!(record.tier(), Some(MemoryTier::ShortTerm));
        assert_eq!(record.metadata[META_TTL], 3600);
    }

    #[tokio::test]
    async fn test_short_term_expires_after_ttl() {
        let (store, clock) = store_with_clock();
        store
            .save_short_term_memory("mem", MemoryRecord::new("k1", "fleeting"), Some(30))
            .await
            .unwrap();

        clock.advance(29);
        assert!(store.get_memory("mem", "k1", false).await.unwrap().is_some());

        clock.advance(1);
        assert!(store.get_memory("mem", "k1", false).await.unwrap().is_none());
        // Lazily deleted on read.
        assert!(store.vectors().get("mem", "k1", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_invalid_argument() {
        let (store, _clock) = store_with_clock();
        let err = store
            .save_short_term_memory("mem", MemoryRecord::new("k", "x"), Some(0))
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_invalid_argument() {
        let (store, _clock) = store_with_clock();
        for ttl in [u64::MAX, 10_000_000_000_000] {
            let err = store
                .save_short_term_memory("mem", MemoryRecord::new("k", "x"), Some(ttl))
                .await
                .unwrap_err();
            assert!(err.is_invalid_argument());
        }
        assert!(store.get_memory("mem", "k", false).await.unwrap().is_none());
        assert!(store.vectors().get("mem", "k", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_long_term_get() {
        let (store, clock) = store_with_clock();
        store
            .save_long_term_memory("mem", MemoryRecord::new("k2", "durable fact"))
            .await
            .unwrap();
        clock.advance(86_400 * 30);

        let record = store.get_memory("mem", "k2", false).await.unwrap().unwrap();
        assert_eq!(record.metadata[META_MEMORY_TYPE], "long_term");
    }

    #[tokio::test]
    async fn test_promote_short_to_long() {
        let (store, clock) = store_with_clock();
        store
            .save_short_term_memory("mem", MemoryRecord::new("k", "x"), Some(5))
            .await
            .unwrap();
        store
            .save_long_term_memory("mem", MemoryRecord::new("k", "x"))
            .await
            .unwrap();
        clock.advance(10);
        let record = store.get_memory("mem", "k", false).await.unwrap().unwrap();
        assert_eq!(record.tier(), Some(MemoryTier::LongTerm));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, _clock) = store_with_clock();
        store
            .save_long_term_memory("mem", MemoryRecord::new("k", "x"))
            .await
            .unwrap();
        store.remove_memory("mem", "k").await.unwrap();
        store.remove_memory("mem", "k").await.unwrap();
        assert!(store.get_memory("mem", "k", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_collections() {
        let (store, _clock) = store_with_clock();
        store
            .save_long_term_memory("alpha", MemoryRecord::new("k", "x"))
            .await
            .unwrap();
        store
            .save_short_term_memory("beta", MemoryRecord::new("k", "x"), None)
            .await
            .unwrap();
        assert_eq!(store.get_collections().await.unwrap(), vec!["alpha", "beta"]);
    }
}
