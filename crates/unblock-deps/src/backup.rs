//! Timestamped copies of the manifest and lockfile
//!
//! Each backup is a directory `backup-<UTC timestamp>` under the configured
//! backup root, holding the files verbatim plus a `backup.json` record with
//! their SHA-256 hashes. Restoring checks the record against the copies
//! before anything in the project is overwritten.

use crate::checksum::{matches_sha256, sha256_hex};
use crate::npm::{LOCKFILE_FILE, MANIFEST_FILE};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unblock_fs::FileSystem;

/// Name of the record written into every backup directory
pub const BACKUP_RECORD_FILE: &str = "backup.json";

/// Prefix of backup directory names
pub const BACKUP_PREFIX: &str = "backup-";

const BACKED_UP_FILES: [&str; 2] = [MANIFEST_FILE, LOCKFILE_FILE];

/// One copied file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackedUpFile {
    /// File name relative to the project root
    pub name: String,
    /// Hex SHA-256 of the content
    pub sha256: String,
    /// Size in bytes
    pub size: u64,
}

/// Contents of `backup.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
    /// Files in the backup
    pub files: Vec<BackedUpFile>,
    /// Backup directory (not serialized)
    #[serde(skip)]
    pub path: PathBuf,
}

/// Creates, lists, restores and prunes backups
pub struct BackupManager<F> {
    fs: Arc<F>,
    backup_root: PathBuf,
}

impl<F: FileSystem> BackupManager<F> {
    /// Backups stored under `backup_root` (relative paths are resolved
    /// against the project root)
    pub fn new(fs: Arc<F>, backup_root: impl AsRef<Path>) -> Self {
        let backup_root = fs.project_root().join(backup_root.as_ref());
        Self { fs, backup_root }
    }

    /// Directory holding all backups
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Copy the manifest and lockfile into a new backup directory.
    ///
    /// # Errors
    /// [`Error::FileNotFound`] when neither file exists, [`Error::FileAccess`]
    /// when a copy cannot be read or written.
    pub async fn create(&self) -> Result<BackupRecord> {
        let root = self.fs.project_root().to_path_buf();

        let mut contents = Vec::new();
        for name in BACKED_UP_FILES {
            let path = root.join(name);
            match self.fs.read(&path).await {
                Ok(bytes) => contents.push((name, bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("{} not present, not backed up", name);
                }
                Err(e) => return Err(Error::file_access(path, e)),
            }
        }
        if contents.is_empty() {
            return Err(Error::FileNotFound(root.join(MANIFEST_FILE)));
        }

        let created_at = Utc::now();
        let dir = self.unused_dir(&created_at).await?;
        self.fs
            .create_dir_all(&dir)
            .await
            .map_err(|e| Error::file_access(&dir, e))?;

        let mut files = Vec::with_capacity(contents.len());
        for (name, bytes) in &contents {
            let path = dir.join(name);
            self.fs
                .write_bytes(&path, bytes)
                .await
                .map_err(|e| Error::file_access(&path, e))?;
            files.push(BackedUpFile {
                name: name.to_string(),
                sha256: sha256_hex(bytes),
                size: bytes.len() as u64,
            });
        }

        let record = BackupRecord {
            created_at,
            files,
            path: dir.clone(),
        };
        let record_path = dir.join(BACKUP_RECORD_FILE);
        let json = serde_json::to_string_pretty(&record)?;
        self.fs
            .write(&record_path, &json)
            .await
            .map_err(|e| Error::file_access(&record_path, e))?;

        tracing::info!(path = %dir.display(), files = record.files.len(), "backup created");
        Ok(record)
    }

    async fn unused_dir(&self, created_at: &DateTime<Utc>) -> Result<PathBuf> {
        let stem = format!(
            "{BACKUP_PREFIX}{}",
            created_at.format("%Y%m%dT%H%M%S%3fZ")
        );
        let mut dir = self.backup_root.join(&stem);
        let mut suffix = 1;
        while self
            .fs
            .exists(&dir)
            .await
            .map_err(|e| Error::file_access(&dir, e))?
        {
            dir = self.backup_root.join(format!("{stem}-{suffix}"));
            suffix += 1;
        }
        Ok(dir)
    }

    /// Read `backup.json` from a backup directory
    pub async fn read_record(&self, dir: &Path) -> Result<BackupRecord> {
        let path = dir.join(BACKUP_RECORD_FILE);
        let json = self
            .fs
            .read_to_string(&path)
            .await
            .map_err(|e| Error::restore(dir, format!("cannot read {BACKUP_RECORD_FILE}: {e}")))?;
        let mut record: BackupRecord = serde_json::from_str(&json)
            .map_err(|e| Error::restore(dir, format!("invalid {BACKUP_RECORD_FILE}: {e}")))?;
        record.path = dir.to_path_buf();
        Ok(record)
    }

    /// Put the files of the backup at `dir` back into the project.
    ///
    /// Every copy is checked (known name, matching hash, valid JSON) before
    /// the first one is written. Writes go through a temp file and a rename,
    /// and each restored file must parse afterwards.
    ///
    /// # Errors
    /// [`Error::Restore`] for any integrity or write failure.
    pub async fn restore(&self, dir: &Path) -> Result<BackupRecord> {
        let dir = self.fs.project_root().join(dir);
        let is_dir = self
            .fs
            .metadata(&dir)
            .await
            .map(|m| m.is_dir)
            .unwrap_or(false);
        if !is_dir {
            return Err(Error::restore(&dir, "backup directory does not exist"));
        }

        let record = self.read_record(&dir).await?;
        if record.files.is_empty() {
            return Err(Error::restore(&dir, "backup contains no files"));
        }

        let mut verified = Vec::with_capacity(record.files.len());
        for file in &record.files {
            if !BACKED_UP_FILES.contains(&file.name.as_str()) {
                return Err(Error::restore(
                    &dir,
                    format!("unexpected file '{}' in backup record", file.name),
                ));
            }
            let bytes = self
                .fs
                .read(&dir.join(&file.name))
                .await
                .map_err(|e| Error::restore(&dir, format!("cannot read {}: {e}", file.name)))?;
            if !matches_sha256(&bytes, &file.sha256) {
                return Err(Error::restore(
                    &dir,
                    format!("{} does not match its recorded checksum", file.name),
                ));
            }
            serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
                Error::restore(&dir, format!("{} is not valid JSON: {e}", file.name))
            })?;
            verified.push((file.name.as_str(), bytes));
        }

        let root = self.fs.project_root().to_path_buf();
        for (name, bytes) in verified {
            let target = root.join(name);
            write_atomic(self.fs.as_ref(), &target, &bytes)
                .await
                .map_err(|e| Error::restore(&dir, format!("cannot write {name}: {e}")))?;

            let written = self
                .fs
                .read(&target)
                .await
                .map_err(|e| Error::restore(&dir, format!("cannot re-read {name}: {e}")))?;
            if serde_json::from_slice::<serde_json::Value>(&written).is_err() {
                return Err(Error::restore(
                    &dir,
                    format!("restored {name} does not parse"),
                ));
            }
            tracing::debug!("restored {}", name);
        }

        tracing::info!(path = %dir.display(), "backup restored");
        Ok(record)
    }

    /// All readable backups, newest first. Unreadable directories are skipped.
    pub async fn list(&self) -> Result<Vec<BackupRecord>> {
        let exists = self
            .fs
            .exists(&self.backup_root)
            .await
            .map_err(|e| Error::file_access(&self.backup_root, e))?;
        if !exists {
            return Ok(Vec::new());
        }

        let entries = self
            .fs
            .read_dir(&self.backup_root)
            .await
            .map_err(|e| Error::file_access(&self.backup_root, e))?;

        let mut records = Vec::new();
        for entry in entries {
            let is_backup = entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(BACKUP_PREFIX));
            if !is_backup {
                continue;
            }
            match self.read_record(&entry).await {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping backup: {}", e),
            }
        }

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(records)
    }

    /// The most recent backup, if any
    pub async fn latest(&self) -> Result<Option<BackupRecord>> {
        Ok(self.list().await?.into_iter().next())
    }

    /// Delete all but the `keep` newest backups, returning what was removed
    pub async fn cleanup(&self, keep: usize) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for record in self.list().await?.into_iter().skip(keep) {
            self.fs
                .remove_dir_all(&record.path)
                .await
                .map_err(|e| Error::file_access(&record.path, e))?;
            tracing::debug!(path = %record.path.display(), "removed old backup");
            removed.push(record.path);
        }
        if !removed.is_empty() {
            tracing::info!(removed = removed.len(), kept = keep, "cleaned up backups");
        }
        Ok(removed)
    }

    /// Names of files whose current content differs from the backup
    /// (including files that no longer exist)
    pub async fn detect_drift(&self, record: &BackupRecord) -> Result<Vec<String>> {
        let root = self.fs.project_root().to_path_buf();
        let mut drifted = Vec::new();
        for file in &record.files {
            let path = root.join(&file.name);
            match self.fs.read(&path).await {
                Ok(bytes) if matches_sha256(&bytes, &file.sha256) => {}
                Ok(_) => drifted.push(file.name.clone()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => drifted.push(file.name.clone()),
                Err(e) => return Err(Error::file_access(path, e)),
            }
        }
        Ok(drifted)
    }
}

/// Write `bytes` to `path` via `<path>.<ext>.tmp` and a rename
pub(crate) async fn write_atomic<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
    bytes: &[u8],
) -> io::Result<()> {
    let temp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
    ));
    fs.write_bytes(&temp_path, bytes).await?;
    fs.rename(&temp_path, path).await
}
