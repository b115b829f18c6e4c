use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::graph::edge::EdgeKind;
use crate::graph::node::NodeKind;
use crate::metadata::GraphMetadata;

/// Aggregate statistics produced by one run, for the terminal.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub file_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_type: BTreeMap<NodeKind, usize>,
    pub edges_by_type: BTreeMap<EdgeKind, usize>,
    pub unresolved_imports: usize,
    /// Files or directories skipped because they could not be read.
    pub warnings: usize,
    /// Source regions skipped because they could not be recognised.
    pub anomalies: usize,
    /// Every warning and anomaly, in the order recorded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Where the graph document was written.
    pub output: String,
    /// Wall-clock time for the run in seconds.
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn new(
        file_count: usize,
        metadata: &GraphMetadata,
        diagnostics: &Diagnostics,
        output: String,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            file_count,
            node_count: metadata.node_count,
            edge_count: metadata.edge_count,
            nodes_by_type: metadata.nodes_by_type.clone(),
            edges_by_type: metadata.edges_by_type.clone(),
            unresolved_imports: metadata.unresolved_imports,
            warnings: metadata.warnings,
            anomalies: metadata.anomalies,
            diagnostics: diagnostics.iter().cloned().collect(),
            output,
            elapsed_secs,
        }
    }
}

/// Print a summary of the run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
///
/// Skipped paths and the anomaly count go to **stderr** so that stdout stays clean for
/// downstream JSON consumers.
pub fn print_summary(summary: &RunSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising summary: {}", e),
        }
        return;
    }

    println!(
        "Scanned {} files in {:.2}s",
        summary.file_count, summary.elapsed_secs
    );
    println!(
        "  {} nodes: {}",
        summary.node_count,
        breakdown(NodeKind::ALL.iter().map(|k| (k.as_str(), summary.nodes_by_type.get(k))))
    );
    println!(
        "  {} edges: {}",
        summary.edge_count,
        breakdown(EdgeKind::ALL.iter().map(|k| (k.as_str(), summary.edges_by_type.get(k))))
    );
    if summary.unresolved_imports > 0 {
        println!("  {} unresolved imports", summary.unresolved_imports);
    }
    println!("  Wrote {}", summary.output);

    if summary.warnings > 0 {
        eprintln!("  {} paths skipped (unreadable)", summary.warnings);
        for diag in skipped(summary) {
            eprintln!("    {}: {}", diag.path, diag.message);
        }
    }
    if summary.anomalies > 0 {
        eprintln!("  {} source regions skipped (unrecognised syntax)", summary.anomalies);
    }
}

fn skipped(summary: &RunSummary) -> impl Iterator<Item = &Diagnostic> {
    summary
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Access)
}

/// `3 file, 2 function` style list, omitting zero counts.
fn breakdown<'a>(counts: impl Iterator<Item = (&'a str, Option<&'a usize>)>) -> String {
    let parts: Vec<String> = counts
        .filter_map(|(label, count)| count.filter(|&&c| c > 0).map(|c| format!("{c} {label}")))
        .collect();
    if parts.is_empty() {
        "none".to_owned()
    } else {
        parts.join(", ")
    }
}
