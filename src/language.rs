use std::path::Path;

use serde::Serialize;

/// Source extensions accepted by the walker: the two script dialects and their
/// markup-embedding variants.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Suffixes tried, in order, when resolving an extensionless relative import.
pub const RESOLVE_SUFFIXES: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".d.ts"];

/// Index files tried, in order, when a relative import names a directory.
pub const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx"];

/// The dialect of a scanned source file.
///
/// Plain enum, cheap to copy and pattern-matched where the file node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    TypeScript,
    JavaScript,
}

impl LanguageKind {
    /// Classify a path by its extension. Returns `None` for non-source files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext {
            "ts" | "tsx" => Some(LanguageKind::TypeScript),
            "js" | "jsx" => Some(LanguageKind::JavaScript),
            _ => None,
        }
    }
}

/// True for the markup-embedding variants (`.tsx`, `.jsx`).
pub fn embeds_markup(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("tsx") | Some("jsx")
    )
}
