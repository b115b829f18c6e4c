use super::scanner::Statement;
use super::{Binding, ImportEntity, ImportKind};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A name listed in `export { local as exported }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedName {
    pub local: String,
    pub exported: String,
}

/// How a top-level statement participates in the module system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStatement {
    /// A static, side-effect, namespace, import-equals or re-export statement.
    Import(ImportEntity),
    /// `export { a, b as c }` without a source module.
    ExportNames(Vec<ExportedName>),
    /// `export default Name`, `export = Name`, `module.exports = Name`.
    ExportDefault(String),
    /// Starts with `import` but matches no known form.
    Unrecognized,
    /// Anything else; may still be a declaration.
    NotModule,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

const STATIC_IMPORT: &str =
    r#"^import\s+(?:type\s+)?(?P<clause>[^'"]*?)\s*\bfrom\s*['"](?P<spec>[^'"\n]+)['"]"#;
const SIDE_EFFECT_IMPORT: &str = r#"^import\s*['"](?P<spec>[^'"\n]+)['"]"#;
const IMPORT_EQUALS: &str = r#"^import\s+(?:type\s+)?(?P<local>[A-Za-z_$][\w$]*)\s*=\s*require\s*\(\s*['"](?P<spec>[^'"\n]+)['"]\s*\)"#;
const REEXPORT_ALL: &str = r#"^export\s+(?:type\s+)?\*\s*(?:as\s+(?P<ns>[A-Za-z_$][\w$]*)\s*)?from\s*['"](?P<spec>[^'"\n]+)['"]"#;
const REEXPORT_NAMED: &str =
    r#"^export\s+(?:type\s+)?\{(?P<names>[^}]*)\}\s*from\s*['"](?P<spec>[^'"\n]+)['"]"#;
const EXPORT_LIST: &str = r#"^export\s+(?:type\s+)?\{(?P<names>[^}]*)\}\s*;?\s*$"#;
const EXPORT_DEFAULT_NAME: &str = r#"^export\s+default\s+(?P<name>[A-Za-z_$][\w$]*)\s*;?\s*$"#;
const EXPORT_EQUALS: &str =
    r#"^(?:export\s*=|module\.exports\s*=)\s*(?P<name>[A-Za-z_$][\w$]*)\s*;?\s*$"#;
const CALL_IMPORT: &str =
    r#"\b(?P<callee>require|import)\s*\(\s*['"`](?P<spec>[^'"`\n]+)['"`]\s*\)"#;
const REQUIRE_DECL: &str = r#"^(?:export\s+)?(?:const|let|var)\s+(?P<lhs>\{[^}]*\}|[A-Za-z_$][\w$]*)\s*=\s*require\s*\(\s*['"](?P<spec>[^'"\n]+)['"]\s*\)"#;
const NAMESPACE_CLAUSE: &str = r"\*\s*as\s+(?P<local>[A-Za-z_$][\w$]*)";

pattern!(static_import, STATIC_IMPORT);
pattern!(side_effect_import, SIDE_EFFECT_IMPORT);
pattern!(import_equals, IMPORT_EQUALS);
pattern!(reexport_all, REEXPORT_ALL);
pattern!(reexport_named, REEXPORT_NAMED);
pattern!(export_list, EXPORT_LIST);
pattern!(export_default_name, EXPORT_DEFAULT_NAME);
pattern!(export_equals, EXPORT_EQUALS);
pattern!(call_import, CALL_IMPORT);
pattern!(require_decl, REQUIRE_DECL);
pattern!(namespace_clause, NAMESPACE_CLAUSE);

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a top-level statement by its leading `import` / `export` tokens.
pub fn classify_module_statement(stmt: &Statement) -> ModuleStatement {
    let text = stmt.text.as_str();
    let line = stmt.line;

    if text.starts_with("import") {
        // `import(...)` and `import.meta` are expressions, handled as call imports.
        let rest = &text["import".len()..];
        let after = rest.trim_start();
        if after.starts_with('(') || after.starts_with('.') {
            return ModuleStatement::NotModule;
        }
        // An identifier such as `importer` that merely starts with the keyword.
        if !rest.starts_with(|c: char| c.is_whitespace() || matches!(c, '{' | '*' | '"' | '\'')) {
            return ModuleStatement::NotModule;
        }

        if let Some(caps) = import_equals().captures(text) {
            return ModuleStatement::Import(ImportEntity {
                specifier: caps["spec"].to_owned(),
                kind: ImportKind::Require,
                bindings: vec![Binding {
                    imported: "default".to_owned(),
                    local: caps["local"].to_owned(),
                }],
                line,
            });
        }
        if let Some(caps) = static_import().captures(text) {
            let bindings = parse_import_clause(&caps["clause"]);
            let kind = if bindings.iter().any(|b| b.imported == "*") {
                ImportKind::Namespace
            } else {
                ImportKind::Static
            };
            return ModuleStatement::Import(ImportEntity {
                specifier: caps["spec"].to_owned(),
                kind,
                bindings,
                line,
            });
        }
        if let Some(caps) = side_effect_import().captures(text) {
            return ModuleStatement::Import(ImportEntity {
                specifier: caps["spec"].to_owned(),
                kind: ImportKind::SideEffect,
                bindings: Vec::new(),
                line,
            });
        }
        return ModuleStatement::Unrecognized;
    }

    if text.starts_with("export") {
        if let Some(caps) = reexport_all().captures(text) {
            let bindings = caps
                .name("ns")
                .map(|ns| {
                    vec![Binding {
                        imported: "*".to_owned(),
                        local: ns.as_str().to_owned(),
                    }]
                })
                .unwrap_or_default();
            return ModuleStatement::Import(ImportEntity {
                specifier: caps["spec"].to_owned(),
                kind: ImportKind::Reexport,
                bindings,
                line,
            });
        }
        if let Some(caps) = reexport_named().captures(text) {
            return ModuleStatement::Import(ImportEntity {
                specifier: caps["spec"].to_owned(),
                kind: ImportKind::Reexport,
                bindings: parse_named_list(&caps["names"]),
                line,
            });
        }
        if let Some(caps) = export_list().captures(text) {
            let names = parse_named_list(&caps["names"])
                .into_iter()
                .map(|b| ExportedName {
                    local: b.imported,
                    exported: b.local,
                })
                .collect();
            return ModuleStatement::ExportNames(names);
        }
        if let Some(caps) = export_default_name().captures(text) {
            return ModuleStatement::ExportDefault(caps["name"].to_owned());
        }
    }

    if let Some(caps) = export_equals().captures(text) {
        return ModuleStatement::ExportDefault(caps["name"].to_owned());
    }

    ModuleStatement::NotModule
}

/// Find `require('m')` and `import('m')` calls anywhere inside a statement.
///
/// A `const x = require('m')` declaration contributes its bindings to the matching call.
/// Specifiers built from template substitutions are skipped.
pub fn scan_call_imports(stmt: &Statement) -> Vec<ImportEntity> {
    let text = stmt.text.as_str();
    let mut imports: Vec<ImportEntity> = call_import()
        .captures_iter(text)
        .filter(|caps| !caps["spec"].contains("${"))
        .map(|caps| {
            let offset = caps.get(0).map_or(0, |m| m.start());
            let kind = if &caps["callee"] == "require" {
                ImportKind::Require
            } else {
                ImportKind::Dynamic
            };
            ImportEntity {
                specifier: caps["spec"].to_owned(),
                kind,
                bindings: Vec::new(),
                line: stmt.line + text[..offset].matches('\n').count(),
            }
        })
        .collect();

    if let Some(caps) = require_decl().captures(text)
        && let Some(first) = imports
            .iter_mut()
            .find(|i| i.kind == ImportKind::Require && i.specifier == caps["spec"])
    {
        first.bindings = parse_require_lhs(&caps["lhs"]);
    }

    imports
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the clause between `import` and `from`: default, namespace and named parts.
fn parse_import_clause(clause: &str) -> Vec<Binding> {
    let clause = clause.trim();
    let mut bindings = Vec::new();

    let (head, named) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if close > open => {
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        _ => (clause, None),
    };

    let head = head.trim().trim_end_matches(',').trim();
    let (default_part, namespace_part) = match head.find('*') {
        Some(star) => (head[..star].trim().trim_end_matches(',').trim(), Some(&head[star..])),
        None => (head, None),
    };

    if is_identifier(default_part) {
        bindings.push(Binding {
            imported: "default".to_owned(),
            local: default_part.to_owned(),
        });
    }
    if let Some(ns) = namespace_part
        && let Some(caps) = namespace_clause().captures(ns)
    {
        bindings.push(Binding {
            imported: "*".to_owned(),
            local: caps["local"].to_owned(),
        });
    }
    if let Some(named) = named {
        bindings.extend(parse_named_list(named));
    }
    bindings
}

/// Parse `a, b as c, type D` into bindings (`imported` = left side, `local` = right side).
fn parse_named_list(list: &str) -> Vec<Binding> {
    list.split(',')
        .filter_map(|item| {
            let item = item.trim();
            let item = item.strip_prefix("type ").map(str::trim).unwrap_or(item);
            if item.is_empty() {
                return None;
            }
            let mut parts = item.split_whitespace();
            let imported = parts.next()?.to_owned();
            let local = match (parts.next(), parts.next()) {
                (Some("as"), Some(alias)) => alias.to_owned(),
                _ => imported.clone(),
            };
            Some(Binding { imported, local })
        })
        .collect()
}

/// Bindings for the left-hand side of `const lhs = require('m')`.
fn parse_require_lhs(lhs: &str) -> Vec<Binding> {
    let lhs = lhs.trim();
    if let Some(inner) = lhs.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return inner
            .split(',')
            .filter_map(|item| {
                let item = item.trim();
                if item.is_empty() || item.starts_with("...") {
                    return None;
                }
                let (imported, local) = match item.split_once(':') {
                    Some((key, value)) => (key.trim(), value.trim()),
                    None => (item, item),
                };
                let local = local.split('=').next().unwrap_or(local).trim();
                Some(Binding {
                    imported: imported.to_owned(),
                    local: local.to_owned(),
                })
            })
            .collect();
    }
    vec![Binding {
        imported: "default".to_owned(),
        local: lhs.to_owned(),
    }]
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
