pub mod model;

use std::io::Write;
use std::path::Path;

use crate::error::{CntxtError, Result};
use crate::graph::KnowledgeGraph;
use crate::metadata::GraphMetadata;

use model::{EdgeRecord, GraphDocument};

/// Assemble the output document with canonical ordering: nodes by id, edges by
/// (source, target, type). Two runs over identical input differ only in the timestamp.
pub fn document<'g>(graph: &'g KnowledgeGraph, metadata: &'g GraphMetadata) -> GraphDocument<'g> {
    let mut nodes: Vec<_> = graph.nodes().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<EdgeRecord<'g>> = graph
        .edges()
        .map(|e| EdgeRecord {
            source: &e.source.id,
            target: &e.target.id,
            kind: e.kind,
        })
        .collect();
    edges.sort();

    GraphDocument {
        metadata,
        nodes,
        edges,
    }
}

/// Render the document as pretty-printed JSON.
pub fn to_json(graph: &KnowledgeGraph, metadata: &GraphMetadata) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&document(graph, metadata))
}

/// Write the document to `target` atomically.
///
/// The content is staged in a temporary file in the target's directory and renamed into
/// place only after it has been fully written and flushed, so an interrupted or failed run
/// never leaves a truncated document behind.
pub fn write_document(
    target: &Path,
    graph: &KnowledgeGraph,
    metadata: &GraphMetadata,
) -> Result<()> {
    let fail = |source: std::io::Error| CntxtError::Serialization {
        path: target.to_path_buf(),
        source,
    };

    let json = to_json(graph, metadata).map_err(|err| fail(err.into()))?;

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(json.as_bytes()).map_err(fail)?;
    tmp.write_all(b"\n").map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(target).map_err(|err| fail(err.error))?;

    tracing::info!(path = %target.display(), bytes = json.len(), "graph document written");
    Ok(())
}
