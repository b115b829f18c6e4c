use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CntxtConfig;
use crate::error::{CntxtError, Result};
use crate::language::SOURCE_EXTENSIONS;

/// Directory names never descended into: dependency caches, build output and
/// version-control metadata. Hidden directories are skipped separately.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "jspm_packages",
    "build",
    "dist",
    "out",
    "coverage",
    ".next",
    ".nuxt",
    ".cache",
    ".git",
    ".svn",
    ".hg",
];

/// Enumerates candidate source files under a root.
///
/// The walker itself holds only configuration; each call to [`SourceWalker::files`] starts
/// a fresh traversal, so a walk can be restarted any number of times.
pub struct SourceWalker {
    root: PathBuf,
    ignored_dirs: Arc<HashSet<String>>,
    exclude: Vec<glob::Pattern>,
    respect_gitignore: bool,
}

impl SourceWalker {
    /// Prepare a walk over `root`.
    ///
    /// # Errors
    /// Returns [`CntxtError::RootUnreadable`] when the root cannot be listed. This is the
    /// only fatal walker condition; problems below the root surface per entry.
    pub fn new(root: &Path, config: &CntxtConfig) -> Result<Self> {
        std::fs::read_dir(root).map_err(|source| CntxtError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let mut ignored_dirs: HashSet<String> =
            IGNORED_DIRS.iter().map(|d| (*d).to_owned()).collect();
        if let Some(extra) = &config.ignore_dirs {
            ignored_dirs.extend(extra.iter().cloned());
        }

        let exclude = config
            .exclude
            .iter()
            .flatten()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    tracing::warn!("ignoring invalid exclude pattern {p:?}: {err}");
                    None
                }
            })
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            ignored_dirs: Arc::new(ignored_dirs),
            exclude,
            respect_gitignore: config.respect_gitignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new lazy traversal. Entries are yielded in file-name order within each
    /// directory, so repeated walks over an unchanged tree yield the same sequence.
    pub fn files(&self) -> SourceFiles<'_> {
        let ignored = Arc::clone(&self.ignored_dirs);
        let gitignore = self.respect_gitignore;
        let walk = ignore::WalkBuilder::new(&self.root)
            .hidden(true)
            .parents(gitignore)
            .ignore(gitignore)
            .git_ignore(gitignore)
            .git_global(gitignore)
            .git_exclude(gitignore)
            // Read .gitignore files even when the directory is not inside a git repository.
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| ignored.contains(name))
                        .unwrap_or(false))
            })
            .build();

        SourceFiles { walker: self, walk }
    }

    /// Returns true if `path` matches any exclusion pattern from config.
    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let rel_str = rel.to_string_lossy();

        self.exclude.iter().any(|pattern| {
            pattern.matches(&rel_str)
                || rel
                    .components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .any(|s| pattern.matches(s))
        })
    }
}

/// A single traversal started by [`SourceWalker::files`].
///
/// Yields `Ok(path)` for every accepted source file and `Err(CntxtError::Access)` for
/// entries that could not be read; callers record the latter and keep iterating.
pub struct SourceFiles<'w> {
    walker: &'w SourceWalker,
    walk: ignore::Walk,
}

impl Iterator for SourceFiles<'_> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = error_path(&err).unwrap_or_else(|| self.walker.root.clone());
                    return Some(Err(CntxtError::Access {
                        path,
                        message: err.to_string(),
                    }));
                }
            };

            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(true) {
                continue;
            }

            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !SOURCE_EXTENSIONS.contains(&ext) {
                continue;
            }

            if self.walker.is_excluded(path) {
                continue;
            }

            return Some(Ok(path.to_path_buf()));
        }
    }
}

/// Dig the offending path out of a walk error, if it carries one.
fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}

/// Render `path` relative to `root` with `/` separators, the form used in node ids.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
