use serde::Serialize;

use crate::graph::edge::EdgeKind;
use crate::graph::node::Node;
use crate::metadata::GraphMetadata;

/// The canonical output document: `{ metadata, nodes, edges }`.
#[derive(Debug, Serialize)]
pub struct GraphDocument<'g> {
    pub metadata: &'g GraphMetadata,
    /// Sorted by id.
    pub nodes: Vec<&'g Node>,
    /// Sorted by (source, target, type).
    pub edges: Vec<EdgeRecord<'g>>,
}

/// One serialized edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EdgeRecord<'g> {
    pub source: &'g str,
    pub target: &'g str,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}
