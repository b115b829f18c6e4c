use std::io;
use std::path::PathBuf;

use serde::Serialize;

/// Errors surfaced by the pipeline.
///
/// Only `RootUnreadable` and `Serialization` ever abort a run. `Access` is produced by the
/// walker for a single bad entry and is downgraded to a [`Diagnostic`] by the caller.
#[derive(Debug, thiserror::Error)]
pub enum CntxtError {
    #[error("cannot read root directory {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot access {}: {message}", path.display())]
    Access { path: PathBuf, message: String },

    #[error("failed to write graph document to {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CntxtError>;

/// Category of a non-fatal problem recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A file or directory could not be read and was skipped.
    Access,
    /// A region of a source file could not be recognised and was skipped.
    ParseAnomaly,
}

/// A recorded warning. The run continues past every diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Path relative to the scanned root when known, otherwise as reported.
    pub path: String,
    /// 1-based line for parse anomalies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

/// Ordered collection of diagnostics gathered across all pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        tracing::warn!(path = %path, "{message}");
        self.entries.push(Diagnostic {
            kind: DiagnosticKind::Access,
            path,
            line: None,
            message,
        });
    }

    pub fn anomaly(&mut self, path: impl Into<String>, line: usize, message: impl Into<String>) {
        let path = path.into();
        let message = message.into();
        tracing::debug!(path = %path, line, "parse anomaly: {message}");
        self.entries.push(Diagnostic {
            kind: DiagnosticKind::ParseAnomaly,
            path,
            line: Some(line),
            message,
        });
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}
