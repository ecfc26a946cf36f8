//! FileSystem trait for project-scoped filesystem operations.

use std::io;
use std::path::{Path, PathBuf};

/// File metadata compatible across implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Whether the path exists.
    pub exists: bool,
    /// Whether the path is a file (false if directory or doesn't exist).
    pub is_file: bool,
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// Whether the path is a symbolic link.
    pub is_symlink: bool,
    /// File size in bytes (0 for directories or non-existent files).
    pub size: u64,
}

impl FileMetadata {
    pub(crate) fn missing() -> Self {
        Self {
            exists: false,
            is_file: false,
            is_dir: false,
            is_symlink: false,
            size: 0,
        }
    }
}

/// Project-scoped async filesystem.
///
/// All methods are async so disk access can be moved off the runtime
/// (native) or complete immediately (in-memory).
///
/// ## Error Handling
///
/// Uses `std::io::Result<T>`:
/// - Native: direct mapping from `std::fs` errors
/// - Memory: `io::Error` built with the matching `ErrorKind`
///
/// Paths outside [`FileSystem::project_root`] fail with
/// `io::ErrorKind::PermissionDenied`.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path (file or directory) exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read file contents as a string.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if file doesn't exist.
    /// Returns `io::ErrorKind::InvalidData` if file is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read file contents as bytes.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Get file/directory metadata.
    ///
    /// Returns metadata even if the file doesn't exist (exists=false).
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    /// Write string contents to a file.
    ///
    /// Parent directories are NOT created automatically. Overwrites existing files.
    async fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Write bytes to a file.
    async fn write_bytes(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Remove a file. Symlinks are refused.
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Atomically rename a file.
    ///
    /// Used for atomic file updates (write to .tmp, then rename).
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a directory and all parent directories.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// List the immediate children of a directory, sorted by path.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Remove a directory and everything below it.
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Get the project root this filesystem is scoped to.
    fn project_root(&self) -> &Path;
}
