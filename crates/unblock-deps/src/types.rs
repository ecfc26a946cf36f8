//! Core types for blocker analysis

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use unblock_registry::LatestVersion;

/// One installed package, as recorded in the lockfile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    /// Logical package name (`name` or `@scope/name`)
    pub name: String,
    /// Range declared in the manifest; only set for top-level dependencies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_range: Option<String>,
    /// Exact installed version
    pub resolved_version: String,
    /// Latest published version, once resolved
    pub latest_version: LatestVersion,
    /// This package's own `dependencies`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependency_ranges: BTreeMap<String, String>,
    /// This package's own `peerDependencies`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependency_ranges: BTreeMap<String, String>,
    /// Declared in the manifest's `devDependencies`
    pub is_dev: bool,
}

impl PackageRecord {
    /// Record with no ranges and an unknown latest version
    pub fn new(name: impl Into<String>, resolved_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requested_range: None,
            resolved_version: resolved_version.into(),
            latest_version: LatestVersion::Unknown,
            dependency_ranges: BTreeMap::new(),
            peer_dependency_ranges: BTreeMap::new(),
            is_dev: false,
        }
    }

    /// Whether the manifest names this package directly
    pub fn is_top_level(&self) -> bool {
        self.requested_range.is_some()
    }

    /// The range this package places on `dependency`.
    ///
    /// Regular dependency ranges are consulted before peer ranges; empty
    /// strings are skipped.
    pub fn range_for(&self, dependency: &str) -> Option<&str> {
        [&self.dependency_ranges, &self.peer_dependency_ranges]
            .into_iter()
            .filter_map(|ranges| ranges.get(dependency))
            .map(|range| range.trim())
            .find(|range| !range.is_empty())
    }

    /// Names this package depends on, regular and peer
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependency_ranges
            .keys()
            .chain(self.peer_dependency_ranges.keys())
            .map(String::as_str)
    }
}

/// All installed packages, keyed by logical name, in load order
#[derive(Debug, Clone, Default)]
pub struct PackageTable {
    records: Vec<PackageRecord>,
    index: HashMap<String, usize>,
}

impl PackageTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record unless its name is already present.
    ///
    /// Returns `false` when an earlier record with the same name wins.
    pub fn insert(&mut self, record: PackageRecord) -> bool {
        if self.index.contains_key(&record.name) {
            return false;
        }
        self.index.insert(record.name.clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// Look up a record by name
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut PackageRecord> {
        self.index.get(name).map(|&i| &mut self.records[i])
    }

    /// Whether a package is installed
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All records in load order
    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.iter()
    }

    /// Records the manifest names directly
    pub fn top_level(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.iter().filter(|r| r.is_top_level())
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<PackageRecord> for PackageTable {
    fn from_iter<I: IntoIterator<Item = PackageRecord>>(iter: I) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

/// Classification bucket for a top-level dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum Category {
    /// Latest stays within the current major and nothing rejects it
    Safe,
    /// Latest is a new major and nothing rejects it
    MajorJump,
    /// An installed package declares a range that rejects latest
    #[serde(rename_all = "camelCase")]
    Blocked {
        /// First rejecting package, in name order
        blocker_name: String,
        /// The range it declares
        blocker_range: String,
        /// How many installed packages reject latest
        blocker_count: usize,
    },
}

impl Category {
    /// Short label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::MajorJump => "majorJump",
            Self::Blocked { .. } => "blocked",
        }
    }

    /// Blocking package, if blocked
    pub fn blocker_name(&self) -> Option<&str> {
        match self {
            Self::Blocked { blocker_name, .. } => Some(blocker_name),
            _ => None,
        }
    }
}

/// A top-level dependency with its bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedDependency {
    /// The package as loaded, with its latest version filled in
    #[serde(flatten)]
    pub record: PackageRecord,
    /// Upgrade target (same as `record.latest_version`)
    #[serde(skip)]
    pub latest: String,
    /// Bucket
    #[serde(flatten)]
    pub category: Category,
}

impl ClassifiedDependency {
    /// Package name
    pub fn name(&self) -> &str {
        &self.record.name
    }
}

/// Counters describing one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    /// Installed packages
    pub packages: usize,
    /// Dependency edges in the graph
    pub edges: usize,
    /// Names resolved for top-level dependencies
    pub top_level_lookups: usize,
    /// Names resolved while looking for blockers
    pub blocker_lookups: usize,
    /// Top-level dependencies whose latest version stayed unknown
    pub unresolved: usize,
}

/// Output of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Upgradable within the current major
    pub safe: Vec<ClassifiedDependency>,
    /// Rejected by an installed package's range
    pub blocked: Vec<ClassifiedDependency>,
    /// Upgradable across a major version
    pub major_jump: Vec<ClassifiedDependency>,
    /// Every installed top-level dependency
    pub top_level: Vec<PackageRecord>,
    /// Manifest entries with no lockfile entry
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_installed: Vec<String>,
    /// Run counters
    pub stats: AnalysisStats,
}

impl AnalysisResult {
    /// Classified entries across all three buckets
    pub fn classified(&self) -> impl Iterator<Item = &ClassifiedDependency> {
        self.safe
            .iter()
            .chain(self.major_jump.iter())
            .chain(self.blocked.iter())
    }

    /// Bucket for `name`, if it landed in one
    pub fn category_of(&self, name: &str) -> Option<&Category> {
        self.classified()
            .find(|c| c.name() == name)
            .map(|c| &c.category)
    }
}
