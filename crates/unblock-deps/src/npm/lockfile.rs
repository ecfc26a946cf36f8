//! package-lock.json parser (lockfile v2/v3)

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

const NODE_MODULES: &str = "node_modules/";

#[derive(Debug, Deserialize)]
struct PackageLock {
    #[serde(rename = "lockfileVersion")]
    lockfile_version: Option<u32>,

    // Map keeps the file's key order (serde_json `preserve_order`)
    packages: Option<Map<String, Value>>,
}

/// One `packages` entry, decoded once at load time
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    /// Installed version; absent only for `link` entries
    #[serde(default)]
    pub version: Option<String>,

    /// Declared `dependencies`
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Declared `optionalDependencies`
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,

    /// Declared `peerDependencies`
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    /// Only needed for development
    #[serde(default)]
    pub dev: bool,

    /// Only installed when possible
    #[serde(default)]
    pub optional: bool,

    /// Symlink to a workspace package
    #[serde(default)]
    pub link: bool,
}

/// A parsed lockfile: install paths and their entries, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct Lockfile {
    /// `lockfileVersion`
    pub lockfile_version: u32,
    /// `(install path, entry)` pairs, root and `link` entries excluded
    pub entries: Vec<(String, LockEntry)>,
}

impl Lockfile {
    /// Parse lockfile content; `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let malformed = |message: String| Error::MalformedLockfile {
            path: path.to_path_buf(),
            message,
        };

        let lock: PackageLock =
            serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;

        let lockfile_version = lock
            .lockfile_version
            .ok_or_else(|| malformed("missing lockfileVersion".to_string()))?;
        if lockfile_version < 2 {
            return Err(malformed(format!(
                "lockfileVersion {lockfile_version} has no packages map; \
                 regenerate it with npm 7 or newer"
            )));
        }

        let packages = lock
            .packages
            .ok_or_else(|| malformed("missing packages map".to_string()))?;

        let mut entries = Vec::with_capacity(packages.len());
        for (key, value) in packages {
            if key.is_empty() {
                continue;
            }

            let entry: LockEntry = serde_json::from_value(value)
                .map_err(|e| malformed(format!("entry \"{key}\": {e}")))?;

            if entry.link {
                continue;
            }
            if entry.version.is_none() {
                return Err(malformed(format!("entry \"{key}\" has no version")));
            }

            entries.push((key, entry));
        }

        Ok(Self {
            lockfile_version,
            entries,
        })
    }
}

/// Logical package name for an install path.
///
/// Takes what follows the last `node_modules/`; a `@scope/name` pair right
/// after it is kept whole.
///
/// ```
/// use unblock_deps::npm::package_name_from_path;
///
/// assert_eq!(package_name_from_path("node_modules/a/node_modules/b"), Some("b"));
/// assert_eq!(package_name_from_path("node_modules/@types/node"), Some("@types/node"));
/// assert_eq!(package_name_from_path("packages/app"), None);
/// ```
pub fn package_name_from_path(path: &str) -> Option<&str> {
    let start = path.rfind(NODE_MODULES)? + NODE_MODULES.len();
    let rest = &path[start..];

    let end = if rest.starts_with('@') {
        let scope_end = rest.find('/')?;
        let name = &rest[scope_end + 1..];
        let name_len = name.find('/').unwrap_or(name.len());
        if scope_end == 1 || name_len == 0 {
            return None;
        }
        scope_end + 1 + name_len
    } else {
        rest.find('/').unwrap_or(rest.len())
    };

    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

/// How deeply an install path is nested (`node_modules/a` is 1)
pub(crate) fn nesting_depth(path: &str) -> usize {
    path.matches(NODE_MODULES).count()
}
