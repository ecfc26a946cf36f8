//! npm version parsing, range matching and comparison

use crate::{Error, Result};
use node_semver::{Range, Version};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::LazyLock;

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[a-z0-9\-~][a-z0-9\-._~]*/)?[a-z0-9\-~][a-z0-9\-._~]*$")
        .expect("package name pattern is valid")
});

/// Parse an exact version such as `18.2.0`
pub fn parse_version(raw: &str) -> Result<Version> {
    Version::parse(raw.trim()).map_err(|e| Error::InvalidVersion(raw.to_string(), e.to_string()))
}

/// Parse an npm range such as `^18.0.0` or `>=1.2 <3`.
///
/// Non-registry specifiers (`file:`, `git+…`, `workspace:`, `npm:` aliases)
/// are rejected.
pub fn parse_range(raw: &str) -> Result<Range> {
    Range::parse(raw.trim()).map_err(|e| Error::InvalidVersion(raw.to_string(), e.to_string()))
}

/// Whether `version` falls inside `range`
pub fn satisfies(version: &str, range: &str) -> Result<bool> {
    let range = parse_range(range)?;
    let version = parse_version(version)?;
    Ok(range.satisfies(&version))
}

/// Compare two versions
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse_version(a)?.cmp(&parse_version(b)?))
}

/// Determine update type (major, minor, patch)
pub fn update_type(current: &str, latest: &str) -> Result<UpdateType> {
    let c = parse_version(current)?;
    let l = parse_version(latest)?;
    Ok(update_type_of(&c, &l))
}

pub(crate) fn update_type_of(current: &Version, latest: &Version) -> UpdateType {
    if latest <= current {
        UpdateType::None
    } else if latest.major != current.major {
        UpdateType::Major
    } else if latest.minor != current.minor {
        UpdateType::Minor
    } else {
        UpdateType::Patch
    }
}

/// Whether `name` is a valid npm package name (`name` or `@scope/name`)
pub fn is_valid_package_name(name: &str) -> bool {
    name.len() <= 214 && PACKAGE_NAME.is_match(name)
}

/// Type of version update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// Major version bump (1.0.0 -> 2.0.0) - potentially breaking
    Major,
    /// Minor version bump (1.0.0 -> 1.1.0) - new features
    Minor,
    /// Patch version bump (1.0.0 -> 1.0.1) - bug fixes
    Patch,
    /// No update needed - already on latest
    None,
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::None => "none",
        };
        f.write_str(label)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn version() -> impl Strategy<Value = String> {
        (0u64..200, 0u64..200, 0u64..200).prop_map(|(a, b, c)| format!("{a}.{b}.{c}"))
    }

    proptest! {
        /// If a < b and b < c, then a < c
        #[test]
        fn version_comparison_is_transitive(a in version(), b in version(), c in version()) {
            let ab = compare_versions(&a, &b).unwrap();
            let bc = compare_versions(&b, &c).unwrap();
            let ac = compare_versions(&a, &c).unwrap();

            if ab == Ordering::Less && bc == Ordering::Less {
                prop_assert_eq!(ac, Ordering::Less);
            }
        }

        #[test]
        fn version_comparison_is_reflexive(v in version()) {
            prop_assert_eq!(compare_versions(&v, &v).unwrap(), Ordering::Equal);
        }

        #[test]
        fn update_type_agrees_with_ordering(current in version(), latest in version()) {
            let kind = update_type(&current, &latest).unwrap();
            let ordering = compare_versions(&current, &latest).unwrap();

            match kind {
                UpdateType::None => prop_assert_ne!(ordering, Ordering::Less),
                _ => prop_assert_eq!(ordering, Ordering::Less),
            }
        }

        #[test]
        fn caret_range_accepts_its_own_base(
            major in 1u64..50,
            minor in 0u64..50,
            patch in 0u64..50,
        ) {
            let v = format!("{major}.{minor}.{patch}");
            let caret = format!("^{v}");
            prop_assert!(satisfies(&v, &caret).unwrap());
            let next_major = format!("{}.0.0", major + 1);
            prop_assert!(!satisfies(&next_major, &caret).unwrap());
        }
    }
}
