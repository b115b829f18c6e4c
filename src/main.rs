mod cli;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use cntxt::config::CntxtConfig;
use cntxt::output::{RunSummary, print_summary};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    let root = match cli.path.clone() {
        Some(path) => path,
        None => prompt_root()?,
    };

    let config = CntxtConfig::load(&root);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output_path());

    let start = Instant::now();
    let build = cntxt::build_graph(&root, &config, cli.parallel)
        .with_context(|| format!("failed to scan {}", root.display()))?;
    cntxt::export::write_document(&output, &build.graph, &build.metadata)
        .context("failed to write the graph document")?;

    let summary = RunSummary::new(
        build.files_scanned,
        &build.metadata,
        &build.diagnostics,
        output.display().to_string(),
        start.elapsed().as_secs_f64(),
    );
    print_summary(&summary, cli.json);

    Ok(())
}

/// Ask for the project root on stdin.
fn prompt_root() -> Result<PathBuf> {
    eprint!("Project root to scan: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read the project root from stdin")?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        bail!("no project root given");
    }
    Ok(PathBuf::from(trimmed))
}
