use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Name of the optional configuration file looked up at the scanned root.
pub const CONFIG_FILE: &str = "cntxt.toml";

/// Default output document name, written to the working directory.
pub const DEFAULT_OUTPUT: &str = "code_knowledge_graph.json";

/// Alias prefixes assumed when `cntxt.toml` has no `[aliases]` table. `@types/` is left
/// out: it names DefinitelyTyped packages.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("@/", "src/"),
    ("~/", "src/"),
    ("@components/", "components/"),
    ("@lib/", "lib/"),
    ("@utils/", "utils/"),
    ("@hooks/", "hooks/"),
    ("@contexts/", "contexts/"),
    ("@app/", "app/"),
];

/// Configuration loaded from `cntxt.toml` at the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CntxtConfig {
    /// Additional path patterns to exclude from scanning (glob syntax).
    pub exclude: Option<Vec<String>>,
    /// Directory names skipped entirely, in addition to the built-in ignore set.
    pub ignore_dirs: Option<Vec<String>>,
    /// Honour `.gitignore` / `.ignore` files found in the tree.
    pub respect_gitignore: bool,
    /// Import alias prefixes mapped to root-relative directories, e.g. `"@/" = "src/"`.
    pub aliases: BTreeMap<String, String>,
    /// Output file name override.
    pub output: Option<PathBuf>,
}

impl Default for CntxtConfig {
    fn default() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|&(prefix, dir)| (prefix.to_owned(), dir.to_owned()))
            .collect();
        Self {
            exclude: None,
            ignore_dirs: None,
            respect_gitignore: true,
            aliases,
            output: None,
        }
    }
}

impl CntxtConfig {
    /// Load configuration from `cntxt.toml` in the given root directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// The output path: the configured name if any, else [`DEFAULT_OUTPUT`].
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }
}
