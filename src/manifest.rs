use std::collections::BTreeMap;
use std::path::Path;

/// Dependency sections of `package.json` that declare external packages.
const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Declared dependency versions from the root `package.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    versions: BTreeMap<String, String>,
}

impl Manifest {
    /// Read `<root>/package.json`. A missing file yields an empty manifest; an unreadable or
    /// malformed one is logged and also yields an empty manifest.
    pub fn load(root: &Path) -> Self {
        let path = root.join("package.json");
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|err| {
                tracing::warn!("ignoring malformed package.json: {err}");
                Self::default()
            }),
            Err(err) => {
                tracing::warn!("cannot read package.json: {err}");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let json: serde_json::Value = serde_json::from_str(content)?;
        let mut versions = BTreeMap::new();
        // Earlier sections win, so a runtime dependency's range beats a dev one.
        for section in DEPENDENCY_SECTIONS {
            if let Some(deps) = json[*section].as_object() {
                for (name, version) in deps {
                    if let Some(version) = version.as_str() {
                        versions
                            .entry(name.clone())
                            .or_insert_with(|| version.to_owned());
                    }
                }
            }
        }
        Ok(Self { versions })
    }

    pub fn version(&self, package: &str) -> Option<&str> {
        self.versions.get(package).map(String::as_str)
    }

    pub fn declares(&self, package: &str) -> bool {
        self.versions.contains_key(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_sections() {
        let manifest = Manifest::parse(
            r#"{
                "name": "app",
                "dependencies": { "react": "^18.2.0" },
                "devDependencies": { "typescript": "~5.4.0", "react": "18.0.0" },
                "peerDependencies": { "@scope/ui": "1.x" },
                "workspaces": ["packages/*"]
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.version("react"), Some("^18.2.0"));
        assert_eq!(manifest.version("typescript"), Some("~5.4.0"));
        assert!(manifest.declares("@scope/ui"));
        assert!(!manifest.declares("lodash"));
        assert!(!manifest.declares("app"));
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Manifest::load(dir.path()), Manifest::default());

        std::fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        assert_eq!(Manifest::load(dir.path()), Manifest::default());
    }
}
