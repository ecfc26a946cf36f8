//! Core domain types for version resolution

use serde::{Serialize, Serializer};
use std::fmt;

/// Outcome of resolving a package's latest published version.
///
/// `Unknown` is a value, not an error: it is what a lookup produces after
/// retries are exhausted or when the package was never looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LatestVersion {
    /// Registry answered with this exact version
    Known(String),
    /// Lookup failed or was never attempted
    #[default]
    Unknown,
}

impl LatestVersion {
    /// The version string, if known
    pub fn as_known(&self) -> Option<&str> {
        match self {
            LatestVersion::Known(v) => Some(v),
            LatestVersion::Unknown => None,
        }
    }

    /// Whether the registry produced a version
    pub fn is_known(&self) -> bool {
        matches!(self, LatestVersion::Known(_))
    }
}

impl fmt::Display for LatestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatestVersion::Known(v) => write!(f, "{}", v),
            LatestVersion::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for LatestVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
