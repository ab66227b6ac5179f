//! GraphRAG knowledge store: vector search fused with graph expansion.

use std::path::Path;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::graph::{
    DirectRelation, GraphStats, KnowledgeGraph, NodeLinkData, RelatedKnowledge,
};
use crate::error::{MemoryError, Result};
use crate::types::{MemoryRecord, Metadata};
use crate::vector::SharedVectorStore;

/// Hop limit used when expanding search hits.
pub const SEARCH_MAX_DISTANCE: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// An outgoing relationship supplied when adding knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub target_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Relationship {
    pub fn new(target_id: impl Into<String>, rel_type: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            rel_type: rel_type.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A vector search hit plus the knowledge reachable from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub record: MemoryRecord,
    pub related: Vec<RelatedKnowledge>,
}

/// A record fetched by key plus its direct relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub record: MemoryRecord,
    pub relations: Vec<DirectRelation>,
}

/// Graph export representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The graph value itself (`"networkx"` or `"graph"`).
    Graph,
    /// Node-link structure (`"dict"`).
    NodeLink,
    /// Node-link structure as a JSON string (`"json"`).
    Json,
}

impl FromStr for ExportFormat {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "networkx" | "graph" => Ok(ExportFormat::Graph),
            "dict" => Ok(ExportFormat::NodeLink),
            "json" => Ok(ExportFormat::Json),
            other => Err(MemoryError::InvalidArgument(format!(
                "unsupported export format '{}', expected networkx, dict or json",
                other
            ))),
        }
    }
}

/// An exported knowledge graph.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeExport {
    Graph(KnowledgeGraph),
    NodeLink(NodeLinkData),
    Json(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Store
// ─────────────────────────────────────────────────────────────────────────────

/// Vector records with a graph projection over their keys.
///
/// Writes touch the vector store first and the graph second. The two are not
/// updated atomically: if the graph step fails after the vector write, the
/// stores disagree until the key is written or removed again.
pub struct KnowledgeStore {
    vectors: SharedVectorStore,
    graph: RwLock<KnowledgeGraph>,
}

impl KnowledgeStore {
    pub fn new(vectors: SharedVectorStore) -> Self {
        Self {
            vectors,
            graph: RwLock::new(KnowledgeGraph::new()),
        }
    }

    /// Start from an existing graph, e.g. a loaded snapshot.
    pub fn with_graph(mut self, graph: KnowledgeGraph) -> Self {
        self.graph = RwLock::new(graph);
        self
    }

    pub fn vectors(&self) -> &SharedVectorStore {
        &self.vectors
    }

    /// Store a record, project it into the graph and add its relationships.
    ///
    /// Relationship targets may not exist yet. Returns the record key.
    pub async fn add_knowledge(
        &self,
        collection: &str,
        record: MemoryRecord,
        relationships: &[Relationship],
    ) -> Result<String> {
        if let Some(bad) = relationships
            .iter()
            .find(|r| r.target_id.is_empty() || r.rel_type.is_empty())
        {
            return Err(MemoryError::InvalidArgument(format!(
                "relationship needs a target_id and type, got target '{}' type '{}'",
                bad.target_id, bad.rel_type
            )));
        }

        let text = record.text.clone();
        let metadata = record.metadata.clone();
        let key = self.vectors.upsert(collection, record).await.map_err(|e| {
            error!(collection, error = %e, "Failed to add knowledge");
            e.context("add_knowledge")
        })?;

        let mut graph = self.graph.write();
        graph.upsert_node(key.clone(), text, metadata);
        for rel in relationships {
            graph
                .add_edge(&key, rel.target_id.clone(), rel.rel_type.clone(), rel.metadata.clone())
                .map_err(|e| {
                    error!(collection, key = %key, target = %rel.target_id, error = %e, "Failed to add relationship");
                    e.context("add_knowledge")
                })?;
        }

        debug!(collection, key = %key, relationships = relationships.len(), "Added knowledge");
        Ok(key)
    }

    /// Vector search, then (with `use_graph`) expand every hit that has a
    /// graph node by up to [`SEARCH_MAX_DISTANCE`] hops.
    pub async fn search_knowledge(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
        use_graph: bool,
    ) -> Result<Vec<KnowledgeHit>> {
        let records = self
            .vectors
            .search(collection, query, limit, min_relevance, None)
            .await
            .map_err(|e| {
                error!(collection, error = %e, "Failed to search knowledge");
                e.context("search_knowledge")
            })?;

        let graph = self.graph.read();
        let hits: Vec<KnowledgeHit> = records
            .into_iter()
            .map(|record| {
                let related = if use_graph {
                    graph.related(&record.key, SEARCH_MAX_DISTANCE, None)
                } else {
                    Vec::new()
                };
                KnowledgeHit { record, related }
            })
            .collect();

        debug!(collection, query, results = hits.len(), use_graph, "Knowledge search complete");
        Ok(hits)
    }

    /// Fetch a record by key. Relations are one hop only.
    pub async fn get_knowledge(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
        with_relationships: bool,
    ) -> Result<Option<KnowledgeEntry>> {
        let record = self
            .vectors
            .get(collection, key, with_embedding)
            .await
            .map_err(|e| {
                error!(collection, key, error = %e, "Failed to get knowledge");
                e.context("get_knowledge")
            })?;

        Ok(record.map(|record| {
            let relations = if with_relationships {
                self.graph.read().neighbors(key)
            } else {
                Vec::new()
            };
            KnowledgeEntry { record, relations }
        }))
    }

    /// Delete the vector record, then the graph node and its edges.
    pub async fn remove_knowledge(&self, collection: &str, key: &str) -> Result<()> {
        self.vectors.remove(collection, key).await.map_err(|e| {
            error!(collection, key, error = %e, "Failed to remove knowledge");
            e.context("remove_knowledge")
        })?;
        let had_node = self.graph.write().remove_node(key);
        debug!(collection, key, had_node, "Removed knowledge");
        Ok(())
    }

    /// Graph-only traversal from `key`. See [`KnowledgeGraph::related`] for
    /// the type-filter rule.
    pub fn get_related_knowledge(
        &self,
        key: &str,
        max_distance: usize,
        relationship_types: Option<&[String]>,
    ) -> Vec<RelatedKnowledge> {
        self.graph
            .read()
            .related(key, max_distance, relationship_types)
    }

    /// Export the graph. `format` is `networkx`/`graph`, `dict` or `json`.
    pub fn export_knowledge_graph(&self, format: &str) -> Result<KnowledgeExport> {
        let format: ExportFormat = format.parse().inspect_err(|e| {
            error!(error = %e, "Failed to export knowledge graph");
        })?;
        let graph = self.graph.read();
        Ok(match format {
            ExportFormat::Graph => KnowledgeExport::Graph(graph.clone()),
            ExportFormat::NodeLink => KnowledgeExport::NodeLink(graph.to_node_link()),
            ExportFormat::Json => {
                KnowledgeExport::Json(serde_json::to_string(&graph.to_node_link())?)
            }
        })
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.read().stats()
    }

    /// Write the graph snapshot.
    pub fn save_graph(&self, path: &Path) -> Result<()> {
        self.graph.read().save(path)
    }

    /// Replace the graph with a snapshot from disk.
    pub fn load_graph(&self, path: &Path) -> Result<()> {
        let loaded = KnowledgeGraph::load(path)?;
        let stats = loaded.stats();
        *self.graph.write() = loaded;
        info!(
            path = %path.display(),
            nodes = stats.node_count,
            edges = stats.edge_count,
            "Loaded knowledge graph"
        );
        Ok(())
    }
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("vectors", &self.vectors.name())
            .field("graph", &self.stats())
            .finish()
    }
}
