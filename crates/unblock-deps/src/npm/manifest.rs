//! package.json parser

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    version: Option<String>,

    #[serde(default)]
    dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

/// The parts of `package.json` that declare what the project requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// Project name, if declared
    pub name: Option<String>,
    /// Project version, if declared
    pub version: Option<String>,
    /// `dependencies`
    pub dependencies: BTreeMap<String, String>,
    /// `devDependencies`
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest content; `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let pkg: PackageJson =
            serde_json::from_str(content).map_err(|e| Error::MalformedManifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name: pkg.name,
            version: pkg.version,
            dependencies: pkg.dependencies,
            dev_dependencies: pkg.dev_dependencies,
        })
    }

    /// Every requested name with its range.
    ///
    /// When a name appears in both sections the `devDependencies` range wins.
    pub fn requested(&self) -> BTreeMap<String, String> {
        let mut merged = self.dependencies.clone();
        merged.extend(
            self.dev_dependencies
                .iter()
                .map(|(name, range)| (name.clone(), range.clone())),
        );
        merged
    }

    /// Names whose effective declaration is in `devDependencies`
    pub fn dev_names(&self) -> BTreeSet<&str> {
        self.dev_dependencies.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_overrides_regular() {
        let manifest = Manifest::parse(
            Path::new("package.json"),
            r#"{
                "name": "app",
                "dependencies": { "react": "^18.0.0", "lodash": "^4.1.0" },
                "devDependencies": { "lodash": "^4.17.0", "vitest": "^1.0.0" }
            }"#,
        )
        .unwrap();

        let requested = manifest.requested();
        assert_eq!(requested.len(), 3);
        assert_eq!(requested["lodash"], "^4.17.0");
        assert_eq!(requested["react"], "^18.0.0");
        assert!(manifest.dev_names().contains("lodash"));
        assert!(!manifest.dev_names().contains("react"));
    }

    #[test]
    fn test_sections_are_optional() {
        let manifest = Manifest::parse(Path::new("package.json"), "{}").unwrap();
        assert!(manifest.requested().is_empty());
        assert_eq!(manifest.name, None);
    }

    #[test]
    fn test_malformed() {
        let err = Manifest::parse(Path::new("package.json"), "{ not json").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }));

        let err = Manifest::parse(Path::new("package.json"), r#"{"dependencies": ["react"]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }));
    }
}
