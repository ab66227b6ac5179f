//! Merged relevance search across memory tiers.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::MemoryStore;
use crate::error::Result;
use crate::ttl::is_expired;
use crate::types::{META_MEMORY_TYPE, MemoryRecord, MemoryTier};
use crate::vector::MetadataFilter;

/// Per-tier record counts for a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Live (unexpired) short-term records.
    pub short_term: usize,
    /// Long-term records.
    pub long_term: usize,
}

impl MemoryStats {
    pub fn total(&self) -> usize {
        self.short_term + self.long_term
    }
}

fn tier_filter(tier: MemoryTier) -> MetadataFilter {
    MetadataFilter::new().eq(META_MEMORY_TYPE, tier.as_str())
}

impl MemoryStore {
    /// Search one or both tiers.
    ///
    /// Each requested tier is searched with its own `limit`; the hits are
    /// concatenated short-term first, stable-sorted by relevance descending
    /// (so equal scores keep short-term ahead of long-term) and truncated to
    /// `limit`. Expired short-term hits are deleted and never returned.
    pub async fn search_memory(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
        memory_type: Option<MemoryTier>,
    ) -> Result<Vec<MemoryRecord>> {
        let tiers: &[MemoryTier] = match memory_type {
            Some(MemoryTier::ShortTerm) => &[MemoryTier::ShortTerm],
            Some(MemoryTier::LongTerm) => &[MemoryTier::LongTerm],
            None => &MemoryTier::ALL,
        };

        let mut merged = Vec::new();
        for &tier in tiers {
            let hits = self
                .search_tier(collection, query, limit, min_relevance, tier)
                .await
                .map_err(|e| {
                    error!(collection, tier = %tier, error = %e, "Memory search failed");
                    e.context("search_memory")
                })?;
            merged.extend(hits);
        }

        merged.sort_by(|a, b| {
            b.relevance
                .unwrap_or(0.0)
                .total_cmp(&a.relevance.unwrap_or(0.0))
        });
        merged.truncate(limit);

        debug!(collection, query, results = merged.len(), "Memory search complete");
        Ok(merged)
    }

    /// Search a single tier, widening the window past expired hits so the
    /// tier still yields up to `limit` live records.
    ///
    /// Expired hits are deleted best-effort; the window grows even when a
    /// delete fails, so a stuck record cannot stall the search.
    async fn search_tier(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
        tier: MemoryTier,
    ) -> Result<Vec<MemoryRecord>> {
        let filter = tier_filter(tier);
        let mut window = limit;
        loop {
            let hits = self
                .vectors
                .search(collection, query, window, min_relevance, Some(&filter))
                .await?;

            if tier == MemoryTier::LongTerm {
                return Ok(hits);
            }

            let exhausted = hits.len() < window;
            let now = self.clock.now();
            let (expired, mut live): (Vec<_>, Vec<_>) = hits
                .into_iter()
                .partition(|r| is_expired(&r.metadata, now));

            for record in &expired {
                self.discard_expired(collection, &record.key).await;
            }
            if !expired.is_empty() {
                debug!(collection, dropped = expired.len(), "Dropped expired short-term hits");
            }

            if expired.is_empty() || exhausted || live.len() >= limit {
                live.truncate(limit);
                return Ok(live);
            }
            window = limit + expired.len();
        }
    }

    /// Count live records per tier.
    pub async fn stats(&self, collection: &str) -> Result<MemoryStats> {
        let now = self.clock.now();
        let short_term = self
            .vectors
            .list(collection, Some(&tier_filter(MemoryTier::ShortTerm)), false)
            .await
            .map_err(|e| e.context("memory_stats"))?
            .iter()
            .filter(|r| !is_expired(&r.metadata, now))
            .count();
        let long_term = self
            .vectors
            .count(collection, Some(&tier_filter(MemoryTier::LongTerm)))
            .await
            .map_err(|e| e.context("memory_stats"))?;

        Ok(MemoryStats {
            short_term,
            long_term,
        })
    }

    /// Delete every expired short-term record in a collection. Returns the
    /// number removed.
    ///
    /// Unlike the lazy deletes on read, a failed delete here is an error.
    pub async fn purge_expired(&self, collection: &str) -> Result<usize> {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .vectors
            .list(collection, Some(&tier_filter(MemoryTier::ShortTerm)), false)
            .await
            .map_err(|e| e.context("purge_expired"))?
            .into_iter()
            .filter(|r| is_expired(&r.metadata, now))
            .map(|r| r.key)
            .collect();

        for key in &expired {
            self.vectors
                .remove(collection, key)
                .await
                .map_err(|e| e.context("purge_expired"))?;
        }
        if !expired.is_empty() {
            debug!(collection, purged = expired.len(), "Purged expired memories");
        }
        Ok(expired.len())
    }
}
