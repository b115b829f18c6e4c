/// Declare an accessor for a lazily compiled, process-wide regex.
macro_rules! pattern {
    ($fn_name:ident, $pattern:expr) => {
        fn $fn_name() -> &'static regex::Regex {
            static CELL: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            CELL.get_or_init(|| regex::Regex::new($pattern).expect("invalid built-in pattern"))
        }
    };
}

pub mod declarations;
pub mod imports;
pub mod scanner;

use std::path::Path;

use serde::Serialize;

use declarations::classify_declaration;
use imports::{ModuleStatement, classify_module_statement, scan_call_imports};
use scanner::{Lexed, split_lexed};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// The syntactic form an import took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import X from 'm'`, `import { a } from 'm'`
    Static,
    /// `import * as ns from 'm'`
    Namespace,
    /// `import 'm'`
    SideEffect,
    /// `require('m')` or TS `import x = require('m')`
    Require,
    /// `import('m')`
    Dynamic,
    /// `export * from 'm'`, `export { a } from 'm'`
    Reexport,
}

/// One name brought into scope by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// The name as exported by the target module (`default` / `*` for default and
    /// namespace imports).
    pub imported: String,
    /// The name bound in the importing file.
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntity {
    pub specifier: String,
    pub kind: ImportKind,
    pub bindings: Vec<Binding>,
    pub line: usize,
}

/// The declaration keyword a class-like entity was introduced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Interface,
    /// `type X = { ... }` with an object-literal body.
    TypeAlias,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntity {
    pub name: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    /// Base names; at most one for classes, any number for interfaces.
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub methods: Vec<String>,
    /// Methods named like UI component lifecycle hooks (`componentDidMount`, `render`).
    pub lifecycle: Vec<String>,
    /// Extends a UI component base class (`Component`, `PureComponent`).
    pub is_component: bool,
    pub exported: bool,
    pub default_export: bool,
    pub line: usize,
}

/// How a function-like entity is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionRole {
    Function,
    /// Capitalised and returns markup.
    Component,
    /// Named with the `use` prefix convention.
    Hook,
}

/// The syntax a function-like entity was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionForm {
    Declaration,
    Expression,
    Arrow,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    /// The identifier, or the whitespace-collapsed pattern when destructured.
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub destructured: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntity {
    pub name: String,
    pub role: FunctionRole,
    pub form: FunctionForm,
    pub params: Vec<Param>,
    pub is_async: bool,
    /// Syntactic return-type annotation, if written.
    pub return_type: Option<String>,
    /// Destructured prop names of a component's first parameter.
    pub props: Option<Vec<String>>,
    /// Hook calls made in the body, in first-seen order, deduplicated.
    pub hooks: Vec<String>,
    /// Capitalised JSX elements rendered in the body, first-seen order.
    pub renders: Vec<String>,
    /// Wrapping call such as `memo` or `forwardRef`.
    pub wrapper: Option<String>,
    pub exported: bool,
    pub default_export: bool,
    pub line: usize,
}

/// A structural construct recognised in one file, prior to becoming a graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Import(ImportEntity),
    Class(ClassEntity),
    Function(FunctionEntity),
}

impl Entity {
    /// 1-based line where the entity starts.
    pub fn line(&self) -> usize {
        match self {
            Entity::Import(i) => i.line,
            Entity::Class(c) => c.line,
            Entity::Function(f) => f.line,
        }
    }

    /// The local name: the specifier for imports, the declared name otherwise.
    pub fn name(&self) -> &str {
        match self {
            Entity::Import(i) => &i.specifier,
            Entity::Class(c) => &c.name,
            Entity::Function(f) => &f.name,
        }
    }
}

/// A region of source that could not be recognised. Extraction continued past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseAnomaly {
    pub line: usize,
    pub message: String,
}

/// The result of extracting one file: entities in source order plus anomalies.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub anomalies: Vec<ParseAnomaly>,
    /// Capitalised JSX elements rendered anywhere in the file, first-seen order.
    pub renders: Vec<String>,
}

// ---------------------------------------------------------------------------
// Extractor seam
// ---------------------------------------------------------------------------

/// Text in, entity list out. Everything downstream depends only on [`Extraction`], so a
/// grammar-backed implementation can replace the structural one.
pub trait Extractor: Sync {
    fn extract(&self, path: &Path, source: &str) -> Extraction;
}

/// The default extractor: bracket-depth statement splitting plus leading-token patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralExtractor;

impl Extractor for StructuralExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Extraction {
        extract(source)
    }
}

/// Extract all entities from one file's text.
///
/// Never fails: unrecognised regions become [`ParseAnomaly`] entries and the remaining
/// statements are still classified.
pub fn extract(source: &str) -> Extraction {
    let lexed = Lexed::new(source);
    let (statements, mut anomalies) = split_lexed(&lexed);
    let mut entities = Vec::new();
    let mut export_marks: Vec<(String, bool)> = Vec::new();

    for stmt in &statements {
        match classify_module_statement(stmt) {
            ModuleStatement::Import(import) => {
                entities.push(Entity::Import(import));
                continue;
            }
            ModuleStatement::ExportNames(names) => {
                for name in names {
                    let is_default = name.exported == "default";
                    export_marks.push((name.local, is_default));
                }
                continue;
            }
            ModuleStatement::ExportDefault(name) => {
                export_marks.push((name, true));
                continue;
            }
            ModuleStatement::Unrecognized => {
                anomalies.push(ParseAnomaly {
                    line: stmt.line,
                    message: "unrecognized import statement".to_owned(),
                });
                continue;
            }
            ModuleStatement::NotModule => {}
        }

        match classify_declaration(stmt) {
            Ok(Some(entity)) => entities.push(entity),
            Ok(None) => {}
            Err(anomaly) => anomalies.push(anomaly),
        }

        entities.extend(scan_call_imports(stmt).into_iter().map(Entity::Import));
    }

    for (name, is_default) in export_marks {
        mark_exported(&mut entities, &name, is_default);
    }

    entities.sort_by_key(Entity::line);
    anomalies.sort_by_key(|a| a.line);

    Extraction {
        entities,
        anomalies,
        renders: lexed.rendered_components(0),
    }
}

/// Flag the first declaration named `name` as exported.
fn mark_exported(entities: &mut [Entity], name: &str, is_default: bool) {
    for entity in entities.iter_mut() {
        let (entity_name, exported, default_export) = match entity {
            Entity::Class(c) => (&c.name, &mut c.exported, &mut c.default_export),
            Entity::Function(f) => (&f.name, &mut f.exported, &mut f.default_export),
            Entity::Import(_) => continue,
        };
        if entity_name == name {
            *exported = true;
            *default_export |= is_default;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions(ex: &Extraction) -> Vec<&FunctionEntity> {
        ex.entities
            .iter()
            .filter_map(|e| match e {
                Entity::Function(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_extract_mixed_file_in_source_order() {
        let source = r#"
import React, { useState } from 'react';
import { add } from './utils';

export class Store extends Base {
  get(key) { return this.map[key]; }
}

export function Counter({ start }) {
  const [n, setN] = useState(start);
  return <button onClick={() => setN(n + 1)}>{add(n, 1)}</button>;
}
"#;
        let ex = extract(source);
        assert!(ex.anomalies.is_empty(), "{:?}", ex.anomalies);
        let kinds: Vec<&str> = ex
            .entities
            .iter()
            .map(|e| match e {
                Entity::Import(_) => "import",
                Entity::Class(_) => "class",
                Entity::Function(_) => "function",
            })
            .collect();
        assert_eq!(kinds, vec!["import", "import", "class", "function"]);

        let counter = functions(&ex)[0];
        assert_eq!(counter.role, FunctionRole::Component);
        assert_eq!(counter.hooks, vec!["useState".to_owned()]);
        assert_eq!(counter.props, Some(vec!["start".to_owned()]));
        assert!(counter.exported);
    }

    #[test]
    fn test_export_list_and_default_mark_declarations() {
        let source = "function a() {}\nconst b = () => 1;\nclass C {}\nexport { a, b as renamed };\nexport default C;\n";
        let ex = extract(source);
        let fns = functions(&ex);
        assert!(fns.iter().all(|f| f.exported));
        let class = ex
            .entities
            .iter()
            .find_map(|e| match e {
                Entity::Class(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert!(class.exported && class.default_export);
    }

    #[test]
    fn test_malformed_class_does_not_hide_following_function() {
        let source = "class Broken {\n  method( {\n    return 1;\n}\n\nfunction add(a, b) {\n  return a + b;\n}\n";
        let ex = extract(source);
        assert!(!ex.anomalies.is_empty());
        let fns = functions(&ex);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "add");
        let names: Vec<&str> = fns[0].params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_require_and_dynamic_imports_inside_bodies() {
        let source = "const fs = require('fs');\nasync function load() {\n  const m = await import('./lazy');\n  return m;\n}\n";
        let ex = extract(source);
        let imports: Vec<&ImportEntity> = ex
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::Import(i) => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].kind, ImportKind::Require);
        assert_eq!(imports[0].bindings[0].local, "fs");
        assert_eq!(imports[1].kind, ImportKind::Dynamic);
        assert_eq!(imports[1].specifier, "./lazy");
        assert_eq!(imports[1].line, 3);
    }

    #[test]
    fn test_structural_extractor_matches_free_function() {
        let source = "export const useThing = () => useMemo(() => 1, []);\n";
        let via_trait = StructuralExtractor.extract(Path::new("hooks.ts"), source);
        assert_eq!(via_trait.entities, extract(source).entities);
        let f = functions(&via_trait)[0];
        assert_eq!(f.role, FunctionRole::Hook);
        assert_eq!(f.hooks, vec!["useMemo".to_owned()]);
    }

    fn names<'e>(ex: &'e Extraction) -> Vec<&'e str> {
        functions(ex).iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_regex_literals_do_not_hide_following_functions() {
        let source = "export function splitArgs(line) {\n  return line.split(/\\(/);\n}\n\nexport function after() {\n  return 1;\n}\n";
        let ex = extract(source);
        assert!(ex.anomalies.is_empty(), "{:?}", ex.anomalies);
        assert_eq!(names(&ex), vec!["splitArgs", "after"]);

        let source = "function clean(s) {\n  return s.replace(/'/g, '').replace(/[{]/g, '');\n}\nfunction next() {}\n";
        let ex = extract(source);
        assert!(ex.anomalies.is_empty(), "{:?}", ex.anomalies);
        assert_eq!(names(&ex), vec!["clean", "next"]);
    }

    #[test]
    fn test_markup_text_apostrophes_do_not_open_strings() {
        let source = "export function Promo({ items }) {\n  return (\n    <p>Don't miss {items.map(i => <Item key={i} />)}</p>\n  );\n}\n\nexport function Footer() {\n  return <footer>It's late</footer>;\n}\n";
        let ex = extract(source);
        assert!(ex.anomalies.is_empty(), "{:?}", ex.anomalies);
        assert_eq!(names(&ex), vec!["Promo", "Footer"]);
        assert!(functions(&ex).iter().all(|f| f.role == FunctionRole::Component));
        assert_eq!(ex.renders, vec!["Item".to_owned()]);
    }
}
