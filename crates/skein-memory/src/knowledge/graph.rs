//! Directed, typed knowledge graph.
//!
//! The graph is a projection of stored knowledge records: one node per record
//! key, plus directed edges carrying a relationship type. Parallel edges
//! between the same pair are allowed as long as their types differ. Edges may
//! point at keys that have no node yet; such targets can be walked through but
//! are never reported as related knowledge until their node exists.
//!
//! Iteration order is insertion order everywhere (nodes, out-edges), which
//! makes traversal results and exports deterministic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::types::Metadata;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// A graph vertex keyed by its knowledge record key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A directed, typed relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A node reached by traversal, with the edge types along its shortest path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedKnowledge {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Hop count from the start node.
    pub distance: usize,
    /// Edge types along the shortest path, start first.
    pub relationships: Vec<String>,
}

/// A direct (one-hop) neighbour with the connecting edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectRelation {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub relationship: String,
    pub relationship_metadata: Metadata,
}

/// Node and edge counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}

/// Serializable node-link form of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkData {
    pub directed: bool,
    pub multigraph: bool,
    #[serde(default)]
    pub graph: Metadata,
    pub nodes: Vec<KnowledgeNode>,
    pub links: Vec<KnowledgeEdge>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Graph
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory directed multigraph of knowledge nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    nodes: Vec<KnowledgeNode>,
    index: HashMap<String, usize>,
    out_edges: HashMap<String, Vec<KnowledgeEdge>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&KnowledgeNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &KnowledgeNode> {
        self.nodes.iter()
    }

    /// All edges, grouped by source in node order, each group in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &KnowledgeEdge> {
        self.nodes
            .iter()
            .filter_map(|n| self.out_edges.get(&n.id))
            .flatten()
    }

    /// Outgoing edges of `id` in insertion order.
    pub fn out_edges(&self, id: &str) -> &[KnowledgeEdge] {
        self.out_edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.out_edges.values().map(Vec::len).sum(),
        }
    }

    /// Insert a node, or overwrite text and metadata of an existing one in place.
    /// Existing edges are kept.
    pub fn upsert_node(&mut self, id: impl Into<String>, text: impl Into<String>, metadata: Metadata) {
        let id = id.into();
        let text = text.into();
        match self.index.get(&id) {
            Some(&i) => {
                let node = &mut self.nodes[i];
                node.text = text;
                node.metadata = metadata;
            }
            None => {
                self.index.insert(id.clone(), self.nodes.len());
                self.nodes.push(KnowledgeNode { id, text, metadata });
            }
        }
    }

    /// Add a directed edge from an existing node.
    ///
    /// The target does not need to exist yet. Re-adding the same
    /// `(source, target, type)` replaces the edge metadata.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: impl Into<String>,
        rel_type: impl Into<String>,
        metadata: Metadata,
    ) -> Result<()> {
        if !self.contains(source) {
            return Err(MemoryError::NotFound(format!(
                "knowledge node '{}'",
                source
            )));
        }
        let target = target.into();
        let rel_type = rel_type.into();
        if rel_type.is_empty() {
            return Err(MemoryError::InvalidArgument(
                "relationship type must not be empty".to_string(),
            ));
        }

        let edges = self.out_edges.entry(source.to_string()).or_default();
        match edges
            .iter_mut()
            .find(|e| e.target == target && e.rel_type == rel_type)
        {
            Some(existing) => existing.metadata = metadata,
            None => edges.push(KnowledgeEdge {
                source: source.to_string(),
                target,
                rel_type,
                metadata,
            }),
        }
        Ok(())
    }

    /// Remove a node and every edge touching it. Returns whether it existed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(pos) = self.index.remove(id) else {
            return false;
        };
        self.nodes.remove(pos);
        for (i, node) in self.nodes.iter().enumerate().skip(pos) {
            self.index.insert(node.id.clone(), i);
        }

        self.out_edges.remove(id);
        for edges in self.out_edges.values_mut() {
            edges.retain(|e| e.target != id);
        }
        self.out_edges.retain(|_, edges| !edges.is_empty());
        true
    }

    /// Direct neighbours of `id` that exist as nodes, one entry per edge.
    pub fn neighbors(&self, id: &str) -> Vec<DirectRelation> {
        self.out_edges(id)
            .iter()
            .filter_map(|edge| {
                let node = self.node(&edge.target)?;
                Some(DirectRelation {
                    id: node.id.clone(),
                    text: node.text.clone(),
                    metadata: node.metadata.clone(),
                    relationship: edge.rel_type.clone(),
                    relationship_metadata: edge.metadata.clone(),
                })
            })
            .collect()
    }

    /// Breadth-first expansion from `start`, up to `max_distance` hops.
    ///
    /// Each reachable node is reported once with its shortest path; among
    /// equally short paths the first one discovered in insertion order wins.
    /// With `relationship_types`, a node is kept only if *every* edge on that
    /// shortest path has an allowed type. Longer matching paths are not
    /// searched for.
    pub fn related(
        &self,
        start: &str,
        max_distance: usize,
        relationship_types: Option<&[String]>,
    ) -> Vec<RelatedKnowledge> {
        if !self.contains(start) {
            return Vec::new();
        }

        // Predecessor link: (previous node, edge type) for each discovered node.
        let mut parent: HashMap<&str, (&str, &str)> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start, 0)]);
        let mut order: Vec<(&str, usize)> = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth == max_distance {
                continue;
            }
            for edge in self.out_edges(current) {
                let next = edge.target.as_str();
                if visited.insert(next) {
                    parent.insert(next, (current, edge.rel_type.as_str()));
                    order.push((next, depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }

        let mut related = Vec::new();
        for (id, distance) in order {
            let Some(node) = self.node(id) else {
                continue;
            };

            let mut path = Vec::with_capacity(distance);
            let mut cursor = id;
            while let Some(&(prev, rel)) = parent.get(cursor) {
                path.push(rel.to_string());
                cursor = prev;
            }
            path.reverse();

            if let Some(allowed) = relationship_types
                && !path.iter().all(|rel| allowed.contains(rel))
            {
                continue;
            }

            related.push(RelatedKnowledge {
                id: node.id.clone(),
                text: node.text.clone(),
                metadata: node.metadata.clone(),
                distance,
                relationships: path,
            });
        }
        related
    }

    // ─────────────────────────────────────────────────────────────────────
    // Node-link conversion and snapshots
    // ─────────────────────────────────────────────────────────────────────

    pub fn to_node_link(&self) -> NodeLinkData {
        NodeLinkData {
            directed: true,
            multigraph: true,
            graph: Metadata::new(),
            nodes: self.nodes.clone(),
            links: self.edges().cloned().collect(),
        }
    }

    /// Rebuild a graph from its node-link form.
    pub fn from_node_link(data: NodeLinkData) -> Result<Self> {
        let mut graph = Self::new();
        for node in data.nodes {
            if graph.contains(&node.id) {
                return Err(MemoryError::InvalidData(format!(
                    "duplicate node '{}'",
                    node.id
                )));
            }
            graph.upsert_node(node.id, node.text, node.metadata);
        }
        for link in data.links {
            graph
                .add_edge(&link.source, link.target, link.rel_type, link.metadata)
                .map_err(|e| MemoryError::InvalidData(format!("bad link: {e}")))?;
        }
        Ok(graph)
    }

    /// Write the graph as node-link JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| MemoryError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.to_node_link())?;
        std::fs::write(path, json).map_err(|source| MemoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Saved knowledge graph snapshot");
        Ok(())
    }

    /// Read a snapshot written by [`save`](Self::save). A missing file yields
    /// an empty graph.
    pub fn load(path: &Path) -> Result<Self> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(MemoryError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let data: NodeLinkData = serde_json::from_str(&json)?;
        Self::from_node_link(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn node(graph: &mut KnowledgeGraph, id: &str) {
        graph.upsert_node(id, format!("text of {id}"), Metadata::new());
    }

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// a -cites-> b -cites-> c, a -mentions-> d -cites-> e, b -cites-> a
    fn citation_graph() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new();
        for id in ["a", "b", "c", "d", "e"] {
            node(&mut g, id);
        }
        g.add_edge("a", "b", "cites", Metadata::new()).unwrap();
        g.add_edge("b", "c", "cites", Metadata::new()).unwrap();
        g.add_edge("a", "d", "mentions", Metadata::new()).unwrap();
        g.add_edge("d", "e", "cites", Metadata::new()).unwrap();
        g.add_edge("b", "a", "cites", Metadata::new()).unwrap();
        g
    }

    #[test]
    fn test_related_bfs_with_cycle() {
        let g = citation_graph();
        let related = g.related("a", 2, None);
        let got: Vec<_> = related
            .iter()
            .map(|r| (r.id.as_str(), r.distance, r.relationships.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("b", 1, types(&["cites"])),
                ("d", 1, types(&["mentions"])),
                ("c", 2, types(&["cites", "cites"])),
                ("e", 2, types(&["mentions", "cites"])),
            ]
        );
    }

    #[test]
    fn test_related_respects_cutoff() {
        let g = citation_graph();
        let ids: Vec<_> = g.related("a", 1, None).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert!(g.related("a", 0, None).is_empty());
        assert!(g.related("missing", 2, None).is_empty());
    }

    #[test]
    fn test_type_filter_applies_to_whole_path() {
        let g = citation_graph();
        let allowed = types(&["cites"]);
        let ids: Vec<_> = g
            .related("a", 2, Some(&allowed))
            .into_iter()
            .map(|r| r.id)
            .collect();
        // d and e sit behind a "mentions" edge.
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_filter_excludes_even_with_longer_matching_path() {
        let mut g = KnowledgeGraph::new();
        for id in ["s", "m", "x", "t"] {
            node(&mut g, id);
        }
        // Shortest path s -> t is one "mentions" hop; a longer all-"cites"
        // path s -> m -> x -> t also exists.
        g.add_edge("s", "t", "mentions", Metadata::new()).unwrap();
        g.add_edge("s", "m", "cites", Metadata::new()).unwrap();
        g.add_edge("m", "x", "cites", Metadata::new()).unwrap();
        g.add_edge("x", "t", "cites", Metadata::new()).unwrap();

        let allowed = types(&["cites"]);
        let ids: Vec<_> = g
            .related("s", 3, Some(&allowed))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["m", "x"]);
    }

    #[test]
    fn test_dangling_target_is_traversed_not_reported() {
        let mut g = KnowledgeGraph::new();
        node(&mut g, "a");
        g.add_edge("a", "ghost", "cites", Metadata::new()).unwrap();
        assert!(g.related("a", 2, None).is_empty());
        assert!(g.neighbors("a").is_empty());

        node(&mut g, "ghost");
        let related = g.related("a", 2, None);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, "ghost");
    }

    #[test]
    fn test_parallel_edges_and_metadata_replace() {
        let mut g = KnowledgeGraph::new();
        node(&mut g, "a");
        node(&mut g, "b");
        g.add_edge("a", "b", "cites", meta(&[("w", json!(1))])).unwrap();
        g.add_edge("a", "b", "extends", Metadata::new()).unwrap();
        g.add_edge("a", "b", "cites", meta(&[("w", json!(2))])).unwrap();

        assert_eq!(g.stats().edge_count, 2);
        let neighbors = g.neighbors("a");
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].relationship, "cites");
        assert_eq!(neighbors[0].relationship_metadata["w"], 2);
        assert_eq!(neighbors[1].relationship, "extends");

        // BFS reports b once, via the first edge.
        let related = g.related("a", 2, None);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].relationships, types(&["cites"]));
    }

    #[test]
    fn test_add_edge_requires_source() {
        let mut g = KnowledgeGraph::new();
        let err = g.add_edge("nope", "b", "cites", Metadata::new()).unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut g = citation_graph();
        assert!(g.remove_node("b"));
        assert!(!g.remove_node("b"));

        assert!(!g.contains("b"));
        assert!(g.edges().all(|e| e.source != "b" && e.target != "b"));
        assert_eq!(g.stats(), GraphStats { node_count: 4, edge_count: 2 });
        // Index stays consistent after the shift.
        assert_eq!(g.node("e").unwrap().id, "e");
    }

    #[test]
    fn test_upsert_node_keeps_edges() {
        let mut g = citation_graph();
        g.upsert_node("a", "rewritten", meta(&[("v", json!(2))]));
        assert_eq!(g.node("a").unwrap().text, "rewritten");
        assert_eq!(g.out_edges("a").len(), 2);
        assert_eq!(g.stats().node_count, 5);
    }

    #[test]
    fn test_node_link_round_trip() {
        let mut g = citation_graph();
        g.upsert_node("a", "alpha", meta(&[("topic", json!("rust"))]));
        g.add_edge("c", "zzz", "cites", meta(&[("page", json!(7))])).unwrap();

        let data = g.to_node_link();
        assert!(data.directed && data.multigraph);
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["links"][0]["type"], "cites");

        let rebuilt = KnowledgeGraph::from_node_link(serde_json::from_value(value).unwrap()).unwrap();
        assert_eq!(rebuilt, g);
    }

    #[test]
    fn test_from_node_link_rejects_orphan_link_source() {
        let data = NodeLinkData {
            directed: true,
            multigraph: true,
            graph: Metadata::new(),
            nodes: vec![],
            links: vec![KnowledgeEdge {
                source: "x".into(),
                target: "y".into(),
                rel_type: "cites".into(),
                metadata: Metadata::new(),
            }],
        };
        let err = KnowledgeGraph::from_node_link(data).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidData(_)));
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");

        assert_eq!(KnowledgeGraph::load(&path).unwrap(), KnowledgeGraph::new());

        let g = citation_graph();
        g.save(&path).unwrap();
        assert_eq!(KnowledgeGraph::load(&path).unwrap(), g);
    }
}
