pub mod resolve;

use std::collections::{BTreeMap, HashMap};

use crate::graph::edge::{EdgeKind, Relationship};
use crate::graph::node::{
    ClassAttributes, FileAttributes, FunctionAttributes, HookReference, ImportAttributes, Node,
    NodeAttributes, NodeKind, PackageAttributes, ResolutionKind,
};
use crate::language::LanguageKind;
use crate::manifest::Manifest;
use crate::parser::{ClassEntity, Entity, Extraction, FunctionEntity, FunctionRole, ImportEntity};

use resolve::{ImportResolver, Resolution};

/// One extracted file, ready for registration.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the scanned root, `/`-separated.
    pub rel: String,
    pub language: LanguageKind,
    pub markup: bool,
    pub lines: usize,
    pub extraction: Extraction,
}

/// Everything the graph builder needs to insert.
#[derive(Debug, Default)]
pub struct Registration {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub unresolved_imports: usize,
}

/// The id of a file's node.
pub fn file_id(rel: &str) -> String {
    format!("file:{rel}")
}

pub fn package_id(name: &str) -> String {
    format!("package:{name}")
}

/// Node kind an entity becomes.
pub fn entity_kind(entity: &Entity) -> NodeKind {
    match entity {
        Entity::Import(_) => NodeKind::Import,
        Entity::Class(_) => NodeKind::Class,
        Entity::Function(f) => match f.role {
            FunctionRole::Function => NodeKind::Function,
            FunctionRole::Component => NodeKind::Component,
            FunctionRole::Hook => NodeKind::Hook,
        },
    }
}

/// Assign ids to every entity, resolve imports and derive all relationships.
pub fn register(
    files: &[SourceFile],
    resolver: &ImportResolver,
    manifest: &Manifest,
) -> Registration {
    let mut ordered: Vec<&SourceFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.rel.cmp(&b.rel));

    let scopes: Vec<FileScope<'_>> = ordered
        .into_iter()
        .map(|file| FileScope::new(file, resolver))
        .collect();

    let mut registrar = Registrar {
        index: scopes.iter().map(|s| (s.file.rel.as_str(), s)).collect(),
        manifest,
        out: Registration::default(),
        shared: BTreeMap::new(),
    };
    for scope in &scopes {
        registrar.file(scope);
    }
    registrar.finish()
}

// ---------------------------------------------------------------------------
// Per-file scope
// ---------------------------------------------------------------------------

/// Ids, import resolutions and local bindings of one file.
struct FileScope<'f> {
    file: &'f SourceFile,
    file_id: String,
    /// Entity index -> node id.
    ids: Vec<String>,
    /// Entity index -> resolution, for imports.
    resolutions: Vec<Option<Resolution>>,
    /// Local name -> (import entity index, imported name).
    bindings: HashMap<&'f str, (usize, &'f str)>,
}

impl<'f> FileScope<'f> {
    fn new(file: &'f SourceFile, resolver: &ImportResolver) -> Self {
        let rel = file.rel.as_str();
        let entities = &file.extraction.entities;
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        let mut ids = Vec::with_capacity(entities.len());
        let mut resolutions = Vec::with_capacity(entities.len());
        let mut bindings = HashMap::new();

        for (idx, entity) in entities.iter().enumerate() {
            let base = format!("{}:{rel}#{}", entity_kind(entity).as_str(), entity.name());
            let seen = occurrences.entry(base.clone()).or_insert(0);
            *seen += 1;
            ids.push(if *seen > 1 {
                format!("{base}~{seen}")
            } else {
                base
            });

            let resolution = match entity {
                Entity::Import(import) => {
                    for binding in &import.bindings {
                        bindings
                            .entry(binding.local.as_str())
                            .or_insert((idx, binding.imported.as_str()));
                    }
                    Some(resolver.resolve(rel, &import.specifier))
                }
                _ => None,
            };
            resolutions.push(resolution);
        }

        Self {
            file,
            file_id: file_id(rel),
            ids,
            resolutions,
            bindings,
        }
    }

    /// Id of the first entity of `kind` named `name`.
    fn declared(&self, name: &str, kind: NodeKind) -> Option<&str> {
        self.file
            .extraction
            .entities
            .iter()
            .position(|e| entity_kind(e) == kind && e.name() == name)
            .map(|idx| self.ids[idx].as_str())
    }

    /// Id of the default-exported entity of `kind`.
    fn default_declaration(&self, kind: NodeKind) -> Option<&str> {
        self.file
            .extraction
            .entities
            .iter()
            .position(|e| {
                entity_kind(e) == kind
                    && match e {
                        Entity::Class(c) => c.default_export,
                        Entity::Function(f) => f.default_export,
                        Entity::Import(_) => false,
                    }
            })
            .map(|idx| self.ids[idx].as_str())
    }
}

// ---------------------------------------------------------------------------
// Node and relationship emission
// ---------------------------------------------------------------------------

struct Registrar<'s, 'f> {
    index: HashMap<&'s str, &'s FileScope<'f>>,
    manifest: &'s Manifest,
    out: Registration,
    /// Package and hook-reference nodes, shared by every file that uses them.
    shared: BTreeMap<String, Node>,
}

impl Registrar<'_, '_> {
    fn file(&mut self, scope: &FileScope<'_>) {
        let file = scope.file;
        self.out.nodes.push(Node {
            id: scope.file_id.clone(),
            kind: NodeKind::File,
            name: file.rel.clone(),
            file: Some(file.rel.clone()),
            attributes: NodeAttributes::File(FileAttributes {
                language: file.language,
                markup: file.markup,
                lines: file.lines,
                renders: file.extraction.renders.clone(),
            }),
        });

        for (idx, entity) in file.extraction.entities.iter().enumerate() {
            let id = &scope.ids[idx];
            self.relate(&scope.file_id, id, EdgeKind::Contains);
            match entity {
                Entity::Import(import) => {
                    let resolution = scope.resolutions[idx].as_ref();
                    self.import(scope, id, import, resolution);
                }
                Entity::Class(class) => self.class(scope, id, class),
                Entity::Function(function) => self.function(scope, id, entity, function),
            }
        }
    }

    fn import(
        &mut self,
        scope: &FileScope<'_>,
        id: &str,
        import: &ImportEntity,
        resolution: Option<&Resolution>,
    ) {
        let (kind, target, reason) = match resolution {
            Some(Resolution::File(rel)) => {
                let target = file_id(rel);
                self.relate(&scope.file_id, &target, EdgeKind::Imports);
                (ResolutionKind::File, Some(target), None)
            }
            Some(Resolution::Package { name, builtin }) => {
                let target = self.package(name, *builtin);
                self.relate(&scope.file_id, &target, EdgeKind::Imports);
                self.relate(&scope.file_id, &target, EdgeKind::DependsOnPackage);
                (ResolutionKind::Package, Some(target), None)
            }
            Some(Resolution::Unresolved(reason)) => {
                tracing::debug!(file = %scope.file.rel, specifier = %import.specifier, "{reason}");
                self.out.unresolved_imports += 1;
                (ResolutionKind::Unresolved, None, Some(reason.clone()))
            }
            None => (
                ResolutionKind::Unresolved,
                None,
                Some("not resolved".to_owned()),
            ),
        };

        self.out.nodes.push(Node {
            id: id.to_owned(),
            kind: NodeKind::Import,
            name: import.specifier.clone(),
            file: Some(scope.file.rel.clone()),
            attributes: NodeAttributes::Import(ImportAttributes {
                specifier: import.specifier.clone(),
                kind: import.kind,
                names: import.bindings.iter().map(|b| b.local.clone()).collect(),
                resolution: kind,
                target,
                unresolved: kind == ResolutionKind::Unresolved,
                reason,
                line: import.line,
            }),
        });
    }

    fn class(&mut self, scope: &FileScope<'_>, id: &str, class: &ClassEntity) {
        for base in &class.extends {
            match self.lookup(scope, base, NodeKind::Class) {
                Some(target) if target != id => self.relate(id, &target, EdgeKind::Extends),
                _ => {}
            }
        }

        self.out.nodes.push(Node {
            id: id.to_owned(),
            kind: NodeKind::Class,
            name: class.name.clone(),
            file: Some(scope.file.rel.clone()),
            attributes: NodeAttributes::Class(ClassAttributes {
                kind: class.kind,
                is_abstract: class.is_abstract,
                extends: class.extends.clone(),
                implements: class.implements.clone(),
                methods: class.methods.clone(),
                lifecycle_methods: class.lifecycle.clone(),
                component: class.is_component,
                exported: class.exported,
                default_export: class.default_export,
                line: class.line,
            }),
        });
    }

    fn function(
        &mut self,
        scope: &FileScope<'_>,
        id: &str,
        entity: &Entity,
        function: &FunctionEntity,
    ) {
        for hook in &function.hooks {
            let target = match self.lookup(scope, hook, NodeKind::Hook) {
                Some(target) => target,
                None => self.hook_reference(scope, hook),
            };
            if target != id {
                self.relate(id, &target, EdgeKind::UsesHook);
            }
        }

        self.out.nodes.push(Node {
            id: id.to_owned(),
            kind: entity_kind(entity),
            name: function.name.clone(),
            file: Some(scope.file.rel.clone()),
            attributes: NodeAttributes::Function(FunctionAttributes {
                params: function.params.clone(),
                arity: function.params.len(),
                is_async: function.is_async,
                form: function.form,
                return_type: function.return_type.clone(),
                props: function.props.clone(),
                wrapper: function.wrapper.clone(),
                hooks: function.hooks.clone(),
                renders: function.renders.clone(),
                exported: function.exported,
                default_export: function.default_export,
                line: function.line,
            }),
        });
    }

    /// Resolve a referenced name (`Base`, `ns.Base`) to a declaration of `kind`, either in
    /// the same file or through an import binding into another walked file.
    fn lookup(&self, scope: &FileScope<'_>, reference: &str, kind: NodeKind) -> Option<String> {
        let (head, member) = match reference.split_once('.') {
            Some((head, member)) => (head, Some(member)),
            None => (reference, None),
        };
        if member.is_none()
            && let Some(id) = scope.declared(head, kind)
        {
            return Some(id.to_owned());
        }

        let &(import_idx, imported) = scope.bindings.get(head)?;
        let Some(Resolution::File(rel)) = &scope.resolutions[import_idx] else {
            return None;
        };
        let target = self.index.get(rel.as_str())?;
        let found = match (imported, member) {
            ("*", Some(member)) => target.declared(member, kind),
            ("default", None) => target.default_declaration(kind),
            ("*", None) | (_, Some(_)) => None,
            (name, None) => target.declared(name, kind),
        };
        found.map(str::to_owned)
    }

    /// The shared reference node for a hook declared outside the scanned tree.
    fn hook_reference(&mut self, scope: &FileScope<'_>, hook: &str) -> String {
        let package = scope
            .bindings
            .get(hook)
            .and_then(|&(import_idx, _)| match &scope.resolutions[import_idx] {
                Some(Resolution::Package { name, .. }) => Some(name.clone()),
                _ => None,
            });
        let id = match &package {
            Some(package) => format!("hook:pkg:{package}#{hook}"),
            None => format!("hook:global#{hook}"),
        };
        self.shared.entry(id.clone()).or_insert_with(|| Node {
            id: id.clone(),
            kind: NodeKind::Hook,
            name: hook.to_owned(),
            file: None,
            attributes: NodeAttributes::HookReference(HookReference {
                declared: false,
                package,
            }),
        });
        id
    }

    fn package(&mut self, name: &str, builtin: bool) -> String {
        let id = package_id(name);
        let manifest = self.manifest;
        self.shared.entry(id.clone()).or_insert_with(|| Node {
            id: id.clone(),
            kind: NodeKind::Package,
            name: name.to_owned(),
            file: None,
            attributes: NodeAttributes::Package(PackageAttributes {
                version: manifest.version(name).map(str::to_owned),
                declared: manifest.declares(name),
                builtin,
            }),
        });
        id
    }

    fn relate(&mut self, source: &str, target: &str, kind: EdgeKind) {
        self.out
            .relationships
            .push(Relationship::new(source, target, kind));
    }

    fn finish(mut self) -> Registration {
        self.out.nodes.extend(self.shared.into_values());
        tracing::info!(
            nodes = self.out.nodes.len(),
            relationships = self.out.relationships.len(),
            unresolved = self.out.unresolved_imports,
            "registration complete"
        );
        self.out
    }
}
