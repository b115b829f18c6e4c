use std::collections::{BTreeMap, HashSet};

use crate::language::{INDEX_FILES, RESOLVE_SUFFIXES};

/// Runtime built-in modules. Imported bare or with the `node:` scheme.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// The outcome of resolving one import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A walked file, as a root-relative path.
    File(String),
    /// An external package, keyed by its top-level name.
    Package { name: String, builtin: bool },
    /// Neither; carries the reason.
    Unresolved(String),
}

/// Resolves specifiers for one run.
pub struct ImportResolver {
    files: HashSet<String>,
    /// Alias prefix -> root-relative replacement, longest prefix first.
    aliases: Vec<(String, String)>,
}

impl ImportResolver {
    pub fn new<I>(files: I, aliases: &BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut aliases: Vec<(String, String)> = aliases
            .iter()
            .map(|(prefix, target)| (prefix.clone(), target.trim_start_matches("./").to_owned()))
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self {
            files: files.into_iter().collect(),
            aliases,
        }
    }

    /// Resolve `specifier` as written in the file at root-relative path `from`.
    pub fn resolve(&self, from: &str, specifier: &str) -> Resolution {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return Resolution::Unresolved("empty specifier".to_owned());
        }

        if let Some(module) = specifier.strip_prefix("node:") {
            return Resolution::Package {
                name: package_name(module).to_owned(),
                builtin: true,
            };
        }

        if is_relative(specifier) {
            let dir = from.rsplit_once('/').map_or("", |(dir, _)| dir);
            return match join(dir, specifier) {
                Some(base) => self.resolve_path(&base, specifier),
                None => Resolution::Unresolved(format!("{specifier} escapes the scanned root")),
            };
        }

        if let Some(rooted) = specifier.strip_prefix('/') {
            return match join("", rooted) {
                Some(base) => self.resolve_path(&base, specifier),
                None => Resolution::Unresolved(format!("{specifier} escapes the scanned root")),
            };
        }

        for (prefix, target) in &self.aliases {
            if let Some(rest) = specifier.strip_prefix(prefix.as_str()) {
                let joined = format!("{}/{}", target.trim_end_matches('/'), rest);
                return match join("", &joined) {
                    Some(base) => self.resolve_path(&base, specifier),
                    None => Resolution::Unresolved(format!("alias {prefix} escapes the scanned root")),
                };
            }
        }

        let name = package_name(specifier);
        if !is_package_name(name) {
            return Resolution::Unresolved(format!("{specifier} is not a valid package name"));
        }
        Resolution::Package {
            name: name.to_owned(),
            builtin: NODE_BUILTINS.contains(&name),
        }
    }

    /// Try the literal path, then each suffix, then TypeScript counterparts of script
    /// extensions, then index files inside a directory of that name.
    fn resolve_path(&self, base: &str, specifier: &str) -> Resolution {
        if let Some(found) = self.candidates(base).into_iter().find(|c| self.files.contains(c)) {
            return Resolution::File(found);
        }
        Resolution::Unresolved(format!("no source file matches {specifier}"))
    }

    fn candidates(&self, base: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !base.is_empty() {
            out.push(base.to_owned());
            out.extend(RESOLVE_SUFFIXES.iter().map(|s| format!("{base}{s}")));
            for (script, typed) in [(".js", ".ts"), (".jsx", ".tsx"), (".mjs", ".mts"), (".cjs", ".cts")] {
                if let Some(stem) = base.strip_suffix(script) {
                    out.push(format!("{stem}{typed}"));
                    if script == ".js" {
                        out.push(format!("{stem}.tsx"));
                    }
                }
            }
        }
        let dir = if base.is_empty() {
            String::new()
        } else {
            format!("{base}/")
        };
        out.extend(INDEX_FILES.iter().map(|index| format!("{dir}{index}")));
        out
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// Join a relative specifier onto a root-relative directory, normalising `.` and `..`.
/// Returns `None` when the result would climb above the root.
fn join(dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// The package a bare specifier belongs to.
///
/// - `react` -> `react`
/// - `lodash/merge` -> `lodash`
/// - `@org/utils/helpers` -> `@org/utils`
pub fn package_name(specifier: &str) -> &str {
    let mut segments = specifier.match_indices('/').map(|(i, _)| i);
    let end = if specifier.starts_with('@') {
        segments.nth(1)
    } else {
        segments.next()
    };
    end.map_or(specifier, |end| &specifier[..end])
}

fn is_package_name(name: &str) -> bool {
    let bare = match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, pkg)) if !scope.is_empty() => pkg,
            _ => return false,
        },
        None => name,
    };
    !bare.is_empty()
        && !bare.starts_with('.')
        && bare
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '$'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(files: &[&str]) -> ImportResolver {
        let mut aliases = BTreeMap::new();
        aliases.insert("@/".to_owned(), "src/".to_owned());
        ImportResolver::new(files.iter().map(|f| (*f).to_owned()), &aliases)
    }

    fn file(path: &str) -> Resolution {
        Resolution::File(path.to_owned())
    }

    fn package(name: &str, builtin: bool) -> Resolution {
        Resolution::Package {
            name: name.to_owned(),
            builtin,
        }
    }

    #[test]
    fn test_relative_suffix_and_index() {
        let r = resolver(&["src/main.ts", "src/utils.ts", "src/lib/index.tsx", "types.d.ts"]);
        assert_eq!(r.resolve("src/main.ts", "./utils"), file("src/utils.ts"));
        assert_eq!(r.resolve("src/main.ts", "./utils.ts"), file("src/utils.ts"));
        assert_eq!(r.resolve("src/main.ts", "./lib"), file("src/lib/index.tsx"));
        assert_eq!(r.resolve("src/lib/index.tsx", "../utils"), file("src/utils.ts"));
        assert_eq!(r.resolve("src/main.ts", "../types"), file("types.d.ts"));
    }

    #[test]
    fn test_js_specifier_maps_to_ts_source() {
        let r = resolver(&["src/a.ts", "src/b.tsx"]);
        assert_eq!(r.resolve("src/x.ts", "./a.js"), file("src/a.ts"));
        assert_eq!(r.resolve("src/x.ts", "./b.js"), file("src/b.tsx"));
    }

    #[test]
    fn test_unresolved_relative_is_not_a_package() {
        let r = resolver(&["src/main.ts"]);
        assert!(matches!(r.resolve("src/main.ts", "./missing"), Resolution::Unresolved(_)));
        assert!(matches!(r.resolve("main.ts", "../../outside"), Resolution::Unresolved(_)));
        assert!(matches!(r.resolve("src/main.ts", "./styles.css"), Resolution::Unresolved(_)));
    }

    #[test]
    fn test_root_absolute_and_alias() {
        let r = resolver(&["src/components/Button.tsx"]);
        assert_eq!(
            r.resolve("src/app.ts", "/src/components/Button"),
            file("src/components/Button.tsx")
        );
        assert_eq!(
            r.resolve("src/app.ts", "@/components/Button"),
            file("src/components/Button.tsx")
        );
        assert!(matches!(r.resolve("src/app.ts", "@/nowhere"), Resolution::Unresolved(_)));
    }

    #[test]
    fn test_bare_specifiers_are_packages() {
        let r = resolver(&[]);
        assert_eq!(r.resolve("a.ts", "lodash"), package("lodash", false));
        assert_eq!(r.resolve("a.ts", "lodash/merge"), package("lodash", false));
        assert_eq!(r.resolve("a.ts", "@org/ui/button"), package("@org/ui", false));
        assert_eq!(r.resolve("a.ts", "fs/promises"), package("fs", true));
        assert_eq!(r.resolve("a.ts", "node:path"), package("path", true));
        assert!(matches!(r.resolve("a.ts", "@broken"), Resolution::Unresolved(_)));
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("react"), "react");
        assert_eq!(package_name("@org/utils"), "@org/utils");
        assert_eq!(package_name("@org/utils/helpers"), "@org/utils");
        assert_eq!(package_name("lodash/merge"), "lodash");
    }
}
