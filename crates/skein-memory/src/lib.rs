//! Tiered memory and GraphRAG knowledge storage for Skein.
//!
//! Both stores sit on the [`VectorStore`] capability, which embeds text,
//! keeps records in named collections and answers cosine-similarity searches.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────────┐
//! │  MemoryStore                 │   │  KnowledgeStore                  │
//! │  - short_term / long_term    │   │  - vector search                 │
//! │    tiers via metadata tag    │   │  - KnowledgeGraph projection     │
//! │  - TTL checked on read       │   │  - bounded BFS expansion         │
//! └──────────────┬───────────────┘   └────────────────┬─────────────────┘
//!                └──────────────┬─────────────────────┘
//!                               ▼
//!            ┌───────────────────────────────────────┐
//!            │  VectorStore (InMemory | Sqlite)      │
//!            │  + Embedder from skein-llm            │
//!            └───────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use skein_llm::HashEmbedder;
//! use skein_memory::{MemoryRecord, MemoryStore, SqliteVectorStore};
//!
//! # async fn demo() -> skein_memory::Result<()> {
//! let vectors = Arc::new(SqliteVectorStore::open("memory.db", Arc::new(HashEmbedder::default()))?);
//! let memory = MemoryStore::new(vectors);
//!
//! memory
//!     .save_short_term_memory("semantic_memory", MemoryRecord::new("k1", "met Ana at the conference"), None)
//!     .await?;
//! let hits = memory.search_memory("semantic_memory", "conference", 5, 0.3, None).await?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod knowledge;
pub mod store;
pub mod ttl;
pub mod types;
pub mod validation;
pub mod vector;

// Re-export error types
pub use error::{MemoryError, Result};

// Re-export stores
pub use knowledge::{
    DirectRelation, ExportFormat, GraphStats, KnowledgeEdge, KnowledgeEntry, KnowledgeExport,
    KnowledgeGraph, KnowledgeHit, KnowledgeNode, KnowledgeStore, NodeLinkData, RelatedKnowledge,
    Relationship, SEARCH_MAX_DISTANCE,
};
pub use store::{MemoryStats, MemoryStore};

// Re-export TTL helpers
pub use ttl::{Clock, DEFAULT_TTL_SECS, SharedClock, SystemClock};

// Re-export types
pub use types::{MemoryRecord, MemoryTier, Metadata};

// Re-export vector store
pub use vector::{
    InMemoryVectorStore, MetadataFilter, SharedVectorStore, SqliteVectorStore, VectorStore,
};
