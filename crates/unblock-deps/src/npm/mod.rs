//! npm project loading: `package.json` + `package-lock.json` into a [`PackageTable`]

pub mod lockfile;
pub mod manifest;

pub use lockfile::{package_name_from_path, LockEntry, Lockfile};
pub use manifest::Manifest;

use crate::{Error, PackageRecord, PackageTable, Result};
use std::path::Path;
use unblock_fs::FileSystem;

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// Lockfile file name
pub const LOCKFILE_FILE: &str = "package-lock.json";

/// Which project files are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectFiles {
    /// `package.json` exists
    pub manifest: bool,
    /// `package-lock.json` exists
    pub lockfile: bool,
}

impl ProjectFiles {
    /// Check the project root for both files
    pub async fn detect<F: FileSystem>(fs: &F) -> Result<Self> {
        let root = fs.project_root();
        let manifest_path = root.join(MANIFEST_FILE);
        let lockfile_path = root.join(LOCKFILE_FILE);
        Ok(Self {
            manifest: fs
                .exists(&manifest_path)
                .await
                .map_err(|e| Error::file_access(&manifest_path, e))?,
            lockfile: fs
                .exists(&lockfile_path)
                .await
                .map_err(|e| Error::file_access(&lockfile_path, e))?,
        })
    }
}

/// Everything loaded from one project, built fresh per analysis
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    /// Parsed manifest
    pub manifest: Manifest,
    /// Installed packages
    pub table: PackageTable,
    /// Manifest entries with no lockfile entry, in name order
    pub not_installed: Vec<String>,
}

impl ProjectSnapshot {
    /// Read and parse both files from the project root
    pub async fn load<F: FileSystem>(fs: &F) -> Result<Self> {
        let root = fs.project_root();
        let manifest_path = root.join(MANIFEST_FILE);
        let lockfile_path = root.join(LOCKFILE_FILE);

        let manifest = read(fs, &manifest_path).await?;
        let lockfile = read(fs, &lockfile_path).await?;

        Self::from_parts(
            Manifest::parse(&manifest_path, &manifest)?,
            Lockfile::parse(&lockfile_path, &lockfile)?,
        )
    }

    /// Build a snapshot from already-read file contents
    pub fn from_contents(manifest: &str, lockfile: &str) -> Result<Self> {
        Self::from_parts(
            Manifest::parse(Path::new(MANIFEST_FILE), manifest)?,
            Lockfile::parse(Path::new(LOCKFILE_FILE), lockfile)?,
        )
    }

    /// Combine a parsed manifest and lockfile.
    ///
    /// Entries are visited hoisted-first (by nesting depth, then file order)
    /// and the first entry for a name wins, so a top-level dependency maps to
    /// the copy installed at `node_modules/<name>`.
    pub fn from_parts(manifest: Manifest, lockfile: Lockfile) -> Result<Self> {
        let mut entries: Vec<(usize, &String, &LockEntry)> = lockfile
            .entries
            .iter()
            .map(|(path, entry)| (lockfile::nesting_depth(path), path, entry))
            .collect();
        entries.sort_by_key(|(depth, _, _)| *depth);

        let mut table = PackageTable::new();
        let mut skipped = 0usize;
        for (_, path, entry) in entries {
            let Some(name) = package_name_from_path(path) else {
                tracing::debug!(path = %path, "skipping lockfile entry without a package name");
                skipped += 1;
                continue;
            };
            let Some(version) = entry.version.as_deref() else {
                continue;
            };

            let mut record = PackageRecord::new(name, version);
            record.dependency_ranges = entry.dependencies.clone();
            record
                .dependency_ranges
                .extend(entry.optional_dependencies.clone());
            record.peer_dependency_ranges = entry.peer_dependencies.clone();

            if !table.insert(record) {
                tracing::debug!(path = %path, package = name, "duplicate install path collapsed");
            }
        }

        let dev_names = manifest.dev_names();
        let mut not_installed = Vec::new();
        for (name, range) in manifest.requested() {
            match table.get_mut(&name) {
                Some(record) => {
                    record.is_dev = dev_names.contains(name.as_str());
                    record.requested_range = Some(range);
                }
                None => not_installed.push(name),
            }
        }

        tracing::debug!(
            packages = table.len(),
            skipped,
            not_installed = not_installed.len(),
            "loaded project"
        );

        Ok(Self {
            manifest,
            table,
            not_installed,
        })
    }
}

async fn read<F: FileSystem>(fs: &F, path: &Path) -> Result<String> {
    fs.read_to_string(path)
        .await
        .map_err(|e| Error::file_access(path, e))
}
