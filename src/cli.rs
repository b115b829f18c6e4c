use std::path::PathBuf;

use clap::Parser;

/// Scan a JavaScript/TypeScript project into a structural knowledge graph.
///
/// cntxt walks the source tree, recognises imports, classes, functions, components and
/// hook usage, and writes the resulting graph as a single JSON document.
#[derive(Parser, Debug)]
#[command(name = "cntxt", version, about, long_about = None)]
pub struct Cli {
    /// Project root to scan. Asked for on stdin when omitted.
    pub path: Option<PathBuf>,

    /// Where to write the graph document (default: code_knowledge_graph.json in the
    /// working directory, or the `output` key of cntxt.toml).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Read and extract files on all cores.
    #[arg(long)]
    pub parallel: bool,

    /// Print the run summary as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter implied by the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
