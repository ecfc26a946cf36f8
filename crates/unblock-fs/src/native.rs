//! Native filesystem implementation using std::fs + tokio.

use crate::{FileMetadata, FileSystem};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::task;

/// Native filesystem implementation using std::fs + tokio.
///
/// Blocking std::fs calls are wrapped with tokio::spawn_blocking so the
/// runtime keeps serving registry lookups.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    project_root: PathBuf,
}

impl NativeFileSystem {
    /// Create a new native filesystem scoped to a project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or can't be canonicalized.
    pub fn new(project_root: impl AsRef<Path>) -> io::Result<Self> {
        let root = project_root.as_ref();
        let project_root = root.canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Project root does not exist: {} ({})", root.display(), e),
            )
        })?;

        Ok(Self { project_root })
    }

    /// Validate that a path is within the project root.
    ///
    /// Relative paths are joined onto the root. Paths that don't exist yet are
    /// resolved through their closest existing ancestor so symlinks can't be
    /// used to escape the project.
    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        let resolved = match absolute.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => resolve_missing(&absolute),
        };

        if !resolved.starts_with(&self.project_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside project root {}",
                    resolved.display(),
                    self.project_root.display()
                ),
            ));
        }

        Ok(resolved)
    }
}

/// Canonicalize the longest existing prefix of `path` and append the rest
/// syntactically.
fn resolve_missing(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let mut existing = normalized.clone();
    let mut tail = Vec::new();

    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_owned());
                existing = parent.to_path_buf();
            }
            _ => return normalized,
        }
    }

    let mut resolved = existing.canonicalize().unwrap_or(existing);
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    resolved
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

fn join_error(e: task::JoinError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

#[async_trait::async_trait]
impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || Ok(validated.exists()))
            .await
            .map_err(join_error)?
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::read_to_string(&validated))
            .await
            .map_err(join_error)?
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::read(&validated))
            .await
            .map_err(join_error)?
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || match std::fs::symlink_metadata(&validated) {
            Ok(meta) => Ok(FileMetadata {
                exists: true,
                is_file: meta.is_file(),
                is_dir: meta.is_dir(),
                is_symlink: meta.file_type().is_symlink(),
                size: meta.len(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileMetadata::missing()),
            Err(e) => Err(e),
        })
        .await
        .map_err(join_error)?
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.write_bytes(path, contents.as_bytes()).await
    }

    async fn write_bytes(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        let contents = contents.to_vec();
        task::spawn_blocking(move || std::fs::write(&validated, contents))
            .await
            .map_err(join_error)?
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let validated = self.validate_path(path)?;

        let meta = self.metadata(path).await?;
        if meta.is_symlink {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Refusing to remove symlink",
            ));
        }

        task::spawn_blocking(move || std::fs::remove_file(&validated))
            .await
            .map_err(join_error)?
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_validated = self.validate_path(from)?;
        let to_validated = self.validate_path(to)?;
        task::spawn_blocking(move || std::fs::rename(&from_validated, &to_validated))
            .await
            .map_err(join_error)?
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::create_dir_all(&validated))
            .await
            .map_err(join_error)?
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || {
            let mut entries = std::fs::read_dir(&validated)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()?;
            entries.sort();
            Ok(entries)
        })
        .await
        .map_err(join_error)?
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        if validated == self.project_root {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Refusing to remove the project root",
            ));
        }
        task::spawn_blocking(move || std::fs::remove_dir_all(&validated))
            .await
            .map_err(join_error)?
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}
