//! Core data types for memory records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MemoryError, Result};

/// Free-form record metadata.
pub type Metadata = serde_json::Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Metadata Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Tier tag: `"short_term"` or `"long_term"`.
pub const META_MEMORY_TYPE: &str = "memory_type";

/// Short-term time-to-live, in whole seconds.
pub const META_TTL: &str = "ttl";

/// RFC 3339 timestamp of the last save.
pub const META_STORED_AT: &str = "stored_at";

// ─────────────────────────────────────────────────────────────────────────────
// Memory Record
// ─────────────────────────────────────────────────────────────────────────────

/// A stored unit of text with its embedding and metadata.
///
/// `relevance` is only populated on search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique key within a collection. Empty means "generate one on upsert".
    pub key: String,
    /// Raw text.
    pub text: String,
    /// Embedding vector. Empty means "compute from text on upsert".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Similarity to the query (search results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
}

impl MemoryRecord {
    /// Create a record with the given key and text.
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            embedding: Vec::new(),
            metadata: Metadata::new(),
            relevance: None,
        }
    }

    /// Create a record whose key is generated on upsert.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    /// Set a precomputed embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace all metadata.
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The tier tag, if the record carries a recognised one.
    pub fn tier(&self) -> Option<MemoryTier> {
        self.metadata
            .get(META_MEMORY_TYPE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Tier
// ─────────────────────────────────────────────────────────────────────────────

/// Short-term vs long-term partition, distinguished by the `memory_type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    ShortTerm,
    LongTerm,
}

impl MemoryTier {
    /// Tiers in search order.
    pub const ALL: [MemoryTier; 2] = [MemoryTier::ShortTerm, MemoryTier::LongTerm];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::ShortTerm => "short_term",
            MemoryTier::LongTerm => "long_term",
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryTier {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "short_term" => Ok(MemoryTier::ShortTerm),
            "long_term" => Ok(MemoryTier::LongTerm),
            other => Err(MemoryError::InvalidArgument(format!(
                "unknown memory type '{}', expected short_term or long_term",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builders() {
        let record = MemoryRecord::new("k1", "hello")
            .with_embedding(vec![0.1, 0.2])
            .with_metadata("source", "unit");
        assert_eq!(record.key, "k1");
        assert_eq!(record.embedding.len(), 2);
        assert_eq!(record.metadata["source"], "unit");
        assert!(record.relevance.is_none());
        assert!(MemoryRecord::from_text("x").key.is_empty());
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("short_term".parse::<MemoryTier>().unwrap(), MemoryTier::ShortTerm);
        assert_eq!("long_term".parse::<MemoryTier>().unwrap(), MemoryTier::LongTerm);
        let err = "episodic".parse::<MemoryTier>().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_record_tier_from_metadata() {
        let record = MemoryRecord::new("k", "t").with_metadata(META_MEMORY_TYPE, "long_term");
        assert_eq!(record.tier(), Some(MemoryTier::LongTerm));
        assert_eq!(MemoryRecord::new("k", "t").tier(), None);
    }

    #[test]
    fn test_record_serialization_skips_empty() {
        let json = serde_json::to_value(MemoryRecord::new("k", "t")).unwrap();
        assert!(json.get("embedding").is_none());
        assert!(json.get("relevance").is_none());
    }
}
