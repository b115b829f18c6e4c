pub mod edge;
pub mod node;

use std::collections::{HashMap, HashSet};

use petgraph::Directed;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use edge::EdgeKind;
use node::{Node, NodeKind};

/// Accumulates nodes and deduplicated edges for one run.
///
/// The builder is the only owner of the node and edge collections; [`GraphBuilder::freeze`]
/// consumes it and hands back a read-only [`KnowledgeGraph`].
pub struct GraphBuilder {
    graph: StableGraph<Node, EdgeKind, Directed>,
    /// Node id -> index, for O(1) endpoint lookup.
    id_index: HashMap<String, NodeIndex>,
    /// (source, target, kind) triples already inserted.
    seen_edges: HashSet<(NodeIndex, NodeIndex, EdgeKind)>,
    /// Edge indices grouped by kind.
    kind_index: HashMap<EdgeKind, Vec<EdgeIndex>>,
    dropped_dangling: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            id_index: HashMap::new(),
            seen_edges: HashSet::new(),
            kind_index: HashMap::new(),
            dropped_dangling: 0,
        }
    }

    /// Insert a node. An exact duplicate of an existing node is skipped; a different node
    /// reusing an existing id is discarded with a warning. Returns the index that holds
    /// the id either way.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&existing) = self.id_index.get(&node.id) {
            if self.graph[existing] != node {
                tracing::warn!(id = %node.id, "conflicting node for existing id discarded");
            }
            return existing;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Insert an edge between two existing node ids.
    ///
    /// Returns `false`, inserting nothing, when either endpoint is missing or the
    /// (source, target, kind) triple is already present.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        let (Some(&from), Some(&to)) = (self.id_index.get(source), self.id_index.get(target))
        else {
            tracing::debug!(source, target, kind = kind.as_str(), "dangling edge refused");
            self.dropped_dangling += 1;
            return false;
        };
        if !self.seen_edges.insert((from, to, kind)) {
            return false;
        }
        let edge = self.graph.add_edge(from, to, kind);
        self.kind_index.entry(kind).or_default().push(edge);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Finish the run's mutation phase.
    pub fn freeze(self) -> KnowledgeGraph {
        if self.dropped_dangling > 0 {
            tracing::debug!(count = self.dropped_dangling, "edges refused for missing endpoints");
        }
        KnowledgeGraph {
            graph: self.graph,
            id_index: self.id_index,
            kind_index: self.kind_index,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrowed view of one edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'g> {
    pub source: &'g Node,
    pub target: &'g Node,
    pub kind: EdgeKind,
}

/// The frozen knowledge graph. Exposes nodes and edges read-only.
pub struct KnowledgeGraph {
    graph: StableGraph<Node, EdgeKind, Directed>,
    id_index: HashMap<String, NodeIndex>,
    kind_index: HashMap<EdgeKind, Vec<EdgeIndex>>,
}

impl KnowledgeGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.id_index.get(id).map(|&idx| &self.graph[idx])
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.graph.edge_references().map(|e| self.view(e.source(), e.target(), *e.weight()))
    }

    /// Edges of one kind, using the per-kind index.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = EdgeView<'_>> {
        self.kind_index
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(move |&edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some(self.view(from, to, kind))
            })
    }

    /// Outgoing edges of the node with `id`. Empty for unknown ids.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = EdgeView<'_>> {
        self.id_index
            .get(id)
            .into_iter()
            .flat_map(|&idx| self.graph.edges_directed(idx, Direction::Outgoing))
            .map(|e| self.view(e.source(), e.target(), *e.weight()))
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.outgoing(id).count()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes().filter(move |n| n.kind == kind)
    }

    fn view(&self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> EdgeView<'_> {
        EdgeView {
            source: &self.graph[from],
            target: &self.graph[to],
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{HookReference, NodeAttributes};

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_owned(),
            kind,
            name: id.rsplit('#').next().unwrap_or(id).to_owned(),
            file: None,
            attributes: NodeAttributes::HookReference(HookReference {
                declared: false,
                package: None,
            }),
        }
    }

    #[test]
    fn test_exact_duplicate_node_is_skipped() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(node("hook:global#useX", NodeKind::Hook));
        let b = builder.add_node(node("hook:global#useX", NodeKind::Hook));
        assert_eq!(a, b);
        assert_eq!(builder.node_count(), 1);
    }

    #[test]
    fn test_conflicting_node_keeps_first() {
        let mut builder = GraphBuilder::new();
        builder.add_node(node("x", NodeKind::Hook));
        builder.add_node(node("x", NodeKind::Function));
        let graph = builder.freeze();
        assert_eq!(graph.node("x").map(|n| n.kind), Some(NodeKind::Hook));
    }

    #[test]
    fn test_duplicate_edges_are_refused() {
        let mut builder = GraphBuilder::new();
        builder.add_node(node("a", NodeKind::File));
        builder.add_node(node("b", NodeKind::File));
        assert!(builder.add_edge("a", "b", EdgeKind::Imports));
        assert!(!builder.add_edge("a", "b", EdgeKind::Imports));
        // Same pair, different kind: allowed.
        assert!(builder.add_edge("a", "b", EdgeKind::DependsOnPackage));
        assert_eq!(builder.edge_count(), 2);
    }

    #[test]
    fn test_dangling_edges_are_refused() {
        let mut builder = GraphBuilder::new();
        builder.add_node(node("a", NodeKind::File));
        assert!(!builder.add_edge("a", "missing", EdgeKind::Imports));
        assert!(!builder.add_edge("missing", "a", EdgeKind::Imports));
        assert_eq!(builder.edge_count(), 0);
    }

    #[test]
    fn test_frozen_graph_indexes() {
        let mut builder = GraphBuilder::new();
        for id in ["f", "g", "h"] {
            builder.add_node(node(id, NodeKind::File));
        }
        builder.add_edge("f", "g", EdgeKind::Imports);
        builder.add_edge("f", "h", EdgeKind::Imports);
        builder.add_edge("g", "h", EdgeKind::Contains);
        let graph = builder.freeze();

        assert_eq!(graph.out_degree("f"), 2);
        assert_eq!(graph.out_degree("h"), 0);
        assert_eq!(graph.out_degree("unknown"), 0);
        assert_eq!(graph.edges_of_kind(EdgeKind::Imports).count(), 2);
        assert_eq!(graph.edges_of_kind(EdgeKind::Extends).count(), 0);
        let contains: Vec<_> = graph
            .edges_of_kind(EdgeKind::Contains)
            .map(|e| (e.source.id.as_str(), e.target.id.as_str()))
            .collect();
        assert_eq!(contains, vec![("g", "h")]);
        assert_eq!(graph.edges().count(), 3);
    }
}
