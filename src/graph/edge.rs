use serde::Serialize;

/// The kind of directed edge between two nodes in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// File -> entity: the file declares this class, function, component, hook or import.
    Contains,
    /// File -> File or File -> Package: the file imports from the target.
    Imports,
    /// Class -> Class: the source class or interface extends the target.
    Extends,
    /// Function/Component/Hook -> Hook: the body calls the target hook.
    UsesHook,
    /// File -> Package: the file depends on an external package.
    DependsOnPackage,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Contains,
        EdgeKind::Imports,
        EdgeKind::Extends,
        EdgeKind::UsesHook,
        EdgeKind::DependsOnPackage,
    ];

    /// The serialized tag, e.g. `USES_HOOK`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Imports => "IMPORTS",
            EdgeKind::Extends => "EXTENDS",
            EdgeKind::UsesHook => "USES_HOOK",
            EdgeKind::DependsOnPackage => "DEPENDS_ON_PACKAGE",
        }
    }
}

/// A relationship between two node ids, produced by the registry before the edge exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl Relationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tags_match_as_str() {
        for kind in EdgeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
