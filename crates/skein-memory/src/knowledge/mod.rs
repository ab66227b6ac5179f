//! Knowledge graph and the GraphRAG store built on it.

mod graph;
mod store;

pub use graph::{
    DirectRelation, GraphStats, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, NodeLinkData,
    RelatedKnowledge,
};
pub use store::{
    ExportFormat, KnowledgeEntry, KnowledgeExport, KnowledgeHit, KnowledgeStore, Relationship,
    SEARCH_MAX_DISTANCE,
};
