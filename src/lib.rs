pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod language;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod parser;
pub mod registry;
pub mod walker;

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;

use config::CntxtConfig;
use error::{CntxtError, Diagnostics, Result};
use graph::{GraphBuilder, KnowledgeGraph};
use language::{LanguageKind, embeds_markup};
use manifest::Manifest;
use metadata::GraphMetadata;
use parser::{Extractor, StructuralExtractor};
use registry::SourceFile;
use registry::resolve::ImportResolver;
use walker::{SourceWalker, relative_path};

/// Everything one run produces.
pub struct BuildOutput {
    pub graph: KnowledgeGraph,
    pub metadata: GraphMetadata,
    pub diagnostics: Diagnostics,
    /// Source files that were read and extracted.
    pub files_scanned: usize,
}

/// Run the pipeline over `root` with the default structural extractor.
///
/// # Errors
/// Only [`CntxtError::RootUnreadable`] is fatal here. Unreadable entries and unrecognised
/// syntax are recorded in [`BuildOutput::diagnostics`] and the run continues.
pub fn build_graph(root: &Path, config: &CntxtConfig, parallel: bool) -> Result<BuildOutput> {
    build_graph_with(root, config, parallel, &StructuralExtractor)
}

/// Run the pipeline with a caller-supplied extractor.
pub fn build_graph_with(
    root: &Path,
    config: &CntxtConfig,
    parallel: bool,
    extractor: &dyn Extractor,
) -> Result<BuildOutput> {
    let walker = SourceWalker::new(root, config)?;
    let mut diagnostics = Diagnostics::new();

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in walker.files() {
        match entry {
            Ok(path) => paths.push(path),
            Err(CntxtError::Access { path, message }) => {
                diagnostics.access(relative_path(root, &path), message)
            }
            Err(err) => return Err(err),
        }
    }
    tracing::info!(files = paths.len(), root = %root.display(), "walk complete");

    let load = |path: &PathBuf| load_source(root, path, extractor);
    let loaded: Vec<std::result::Result<SourceFile, (String, String)>> = if parallel {
        paths.par_iter().map(load).collect()
    } else {
        paths.iter().map(load).collect()
    };

    let mut files = Vec::with_capacity(loaded.len());
    for result in loaded {
        match result {
            Ok(file) => {
                for anomaly in &file.extraction.anomalies {
                    diagnostics.anomaly(file.rel.clone(), anomaly.line, anomaly.message.clone());
                }
                files.push(file);
            }
            Err((rel, message)) => diagnostics.access(rel, message),
        }
    }

    let manifest = Manifest::load(root);
    let resolver = ImportResolver::new(files.iter().map(|f| f.rel.clone()), &config.aliases);
    let registration = registry::register(&files, &resolver, &manifest);

    let mut builder = GraphBuilder::new();
    for node in registration.nodes {
        builder.add_node(node);
    }
    let mut duplicates = 0usize;
    for rel in &registration.relationships {
        let inserted = builder.add_edge(&rel.source, &rel.target, rel.kind);
        if !inserted && builder.contains(&rel.source) && builder.contains(&rel.target) {
            duplicates += 1;
        }
    }
    tracing::info!(
        nodes = builder.node_count(),
        edges = builder.edge_count(),
        duplicates,
        "graph built"
    );
    let graph = builder.freeze();

    let metadata = GraphMetadata::compute(
        &graph,
        &root.display().to_string(),
        &diagnostics,
        Utc::now(),
    );

    Ok(BuildOutput {
        graph,
        metadata,
        diagnostics,
        files_scanned: files.len(),
    })
}

/// Read and extract one file. Errors carry the relative path and a message.
fn load_source(
    root: &Path,
    path: &Path,
    extractor: &dyn Extractor,
) -> std::result::Result<SourceFile, (String, String)> {
    let rel = relative_path(root, path);
    let bytes = std::fs::read(path).map_err(|err| (rel.clone(), err.to_string()))?;
    let text = String::from_utf8_lossy(&bytes);
    let extraction = extractor.extract(path, &text);

    Ok(SourceFile {
        language: LanguageKind::from_path(path).unwrap_or(LanguageKind::JavaScript),
        markup: embeds_markup(path),
        lines: text.lines().count(),
        extraction,
        rel,
    })
}
