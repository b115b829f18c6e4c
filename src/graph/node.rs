use serde::Serialize;

use crate::language::LanguageKind;
use crate::parser::{ClassKind, FunctionForm, ImportKind, Param};

/// The type tag of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Class,
    Function,
    Component,
    Hook,
    Import,
    Package,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::File,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Component,
        NodeKind::Hook,
        NodeKind::Import,
        NodeKind::Package,
    ];

    /// The serialized tag, also used as the id prefix for declared entities.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
            NodeKind::Component => "component",
            NodeKind::Hook => "hook",
            NodeKind::Import => "import",
            NodeKind::Package => "package",
        }
    }
}

/// A node in the knowledge graph. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    /// Owning file, relative to the scanned root. Absent for packages and hook references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub attributes: NodeAttributes,
}

/// Variant-specific attributes, serialized inline without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeAttributes {
    File(FileAttributes),
    Class(ClassAttributes),
    /// Functions, components and declared hooks.
    Function(FunctionAttributes),
    /// A hook that is called but not declared in the scanned tree.
    HookReference(HookReference),
    Import(ImportAttributes),
    Package(PackageAttributes),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAttributes {
    pub language: LanguageKind,
    /// `.tsx` / `.jsx`.
    pub markup: bool,
    pub lines: usize,
    /// Capitalised JSX elements rendered anywhere in the file.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub renders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAttributes {
    pub kind: ClassKind,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub methods: Vec<String>,
    /// Methods named like component lifecycle hooks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_methods: Vec<String>,
    /// Extends a UI component base class.
    pub component: bool,
    pub exported: bool,
    pub default_export: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionAttributes {
    pub params: Vec<Param>,
    pub arity: usize,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub form: FunctionForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
    /// Names of hooks called in the body.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<String>,
    /// Capitalised JSX elements rendered in the body.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub renders: Vec<String>,
    pub exported: bool,
    pub default_export: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookReference {
    /// Always false: the hook's declaration was not found in the scanned tree.
    pub declared: bool,
    /// Package the hook was imported from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

/// Where an import specifier resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    File,
    Package,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportAttributes {
    pub specifier: String,
    pub kind: ImportKind,
    /// Local names bound by the import.
    pub names: Vec<String>,
    pub resolution: ResolutionKind,
    /// Id of the File or Package node the import resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Explicit unresolved marker.
    pub unresolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageAttributes {
    /// Version range declared in the root `package.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Listed in the root `package.json`.
    pub declared: bool,
    /// A runtime built-in module such as `fs` or `node:path`.
    pub builtin: bool,
}
