use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DiagnosticKind, Diagnostics};
use crate::graph::KnowledgeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{NodeAttributes, NodeKind};

/// Aggregate statistics over a frozen graph. Purely derived; never mutates the graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphMetadata {
    pub generated_at: DateTime<Utc>,
    /// The scanned root as given.
    pub root: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_type: BTreeMap<NodeKind, usize>,
    pub edges_by_type: BTreeMap<EdgeKind, usize>,
    /// Entities declared in each file (outgoing CONTAINS edges), keyed by relative path.
    pub entities_per_file: BTreeMap<String, usize>,
    /// Mean outgoing edge count per node of each type, rounded to three decimals.
    pub average_out_degree: BTreeMap<NodeKind, f64>,
    pub unresolved_imports: usize,
    pub warnings: usize,
    pub anomalies: usize,
}

impl GraphMetadata {
    /// Compute the metadata record for `graph`.
    pub fn compute(
        graph: &KnowledgeGraph,
        root: &str,
        diagnostics: &Diagnostics,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut nodes_by_type: BTreeMap<NodeKind, usize> = BTreeMap::new();
        let mut out_degree_sum: BTreeMap<NodeKind, usize> = BTreeMap::new();
        let mut entities_per_file = BTreeMap::new();
        let mut unresolved_imports = 0;

        for node in graph.nodes() {
            *nodes_by_type.entry(node.kind).or_insert(0) += 1;
            *out_degree_sum.entry(node.kind).or_insert(0) += graph.out_degree(&node.id);
            if let NodeAttributes::Import(attrs) = &node.attributes
                && attrs.unresolved
            {
                unresolved_imports += 1;
            }
            if node.kind == NodeKind::File {
                entities_per_file.insert(node.name.clone(), 0);
            }
        }

        for edge in graph.edges_of_kind(EdgeKind::Contains) {
            if let Some(count) = entities_per_file.get_mut(&edge.source.name) {
                *count += 1;
            }
        }

        let edges_by_type = EdgeKind::ALL
            .into_iter()
            .map(|kind| (kind, graph.edges_of_kind(kind).count()))
            .filter(|&(_, count)| count > 0)
            .collect();

        let average_out_degree = nodes_by_type
            .iter()
            .map(|(&kind, &count)| {
                let total = out_degree_sum.get(&kind).copied().unwrap_or(0);
                let mean = total as f64 / count as f64;
                (kind, (mean * 1000.0).round() / 1000.0)
            })
            .collect();

        Self {
            generated_at,
            root: root.to_owned(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            nodes_by_type,
            edges_by_type,
            entities_per_file,
            average_out_degree,
            unresolved_imports,
            warnings: diagnostics.count(DiagnosticKind::Access),
            anomalies: diagnostics.count(DiagnosticKind::ParseAnomaly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::graph::node::{FileAttributes, FunctionAttributes, Node};
    use crate::language::LanguageKind;
    use crate::parser::FunctionForm;

    fn file(rel: &str) -> Node {
        Node {
            id: format!("file:{rel}"),
            kind: NodeKind::File,
            name: rel.to_owned(),
            file: Some(rel.to_owned()),
            attributes: NodeAttributes::File(FileAttributes {
                language: LanguageKind::TypeScript,
                markup: false,
                lines: 1,
                renders: Vec::new(),
            }),
        }
    }

    fn function(rel: &str, name: &str) -> Node {
        Node {
            id: format!("function:{rel}#{name}"),
            kind: NodeKind::Function,
            name: name.to_owned(),
            file: Some(rel.to_owned()),
            attributes: NodeAttributes::Function(FunctionAttributes {
                params: Vec::new(),
                arity: 0,
                is_async: false,
                form: FunctionForm::Declaration,
                return_type: None,
                props: None,
                wrapper: None,
                hooks: Vec::new(),
                renders: Vec::new(),
                exported: false,
                default_export: false,
                line: 1,
            }),
        }
    }

    #[test]
    fn test_counts_density_and_out_degree() {
        let mut builder = GraphBuilder::new();
        builder.add_node(file("a.ts"));
        builder.add_node(file("b.ts"));
        builder.add_node(function("a.ts", "f"));
        builder.add_node(function("a.ts", "g"));
        builder.add_edge("file:a.ts", "function:a.ts#f", EdgeKind::Contains);
        builder.add_edge("file:a.ts", "function:a.ts#g", EdgeKind::Contains);
        builder.add_edge("file:a.ts", "file:b.ts", EdgeKind::Imports);
        let graph = builder.freeze();

        let mut diagnostics = Diagnostics::new();
        diagnostics.anomaly("a.ts", 3, "unbalanced");
        let meta = GraphMetadata::compute(&graph, "/repo", &diagnostics, Utc::now());

        assert_eq!(meta.node_count, 4);
        assert_eq!(meta.edge_count, 3);
        assert_eq!(meta.nodes_by_type[&NodeKind::File], 2);
        assert_eq!(meta.nodes_by_type[&NodeKind::Function], 2);
        assert_eq!(meta.edges_by_type[&EdgeKind::Contains], 2);
        assert!(!meta.edges_by_type.contains_key(&EdgeKind::Extends));
        assert_eq!(meta.entities_per_file["a.ts"], 2);
        assert_eq!(meta.entities_per_file["b.ts"], 0);
        assert_eq!(meta.average_out_degree[&NodeKind::File], 1.5);
        assert_eq!(meta.average_out_degree[&NodeKind::Function], 0.0);
        assert_eq!(meta.anomalies, 1);
        assert_eq!(meta.warnings, 0);
    }

    #[test]
    fn test_serializes_enum_keys_as_tags() {
        let graph = GraphBuilder::new().freeze();
        let meta = GraphMetadata::compute(&graph, ".", &Diagnostics::new(), Utc::now());
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["node_count"], 0);
        assert!(value["generated_at"].is_string());
        assert!(value["nodes_by_type"].as_object().unwrap().is_empty());
    }
}
