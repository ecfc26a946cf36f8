//! In-memory filesystem implementation.

use crate::{FileMetadata, FileSystem};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

/// In-memory filesystem rooted at a virtual project directory.
///
/// Directories are tracked explicitly so `read_dir`, `remove_dir_all` and
/// "parent must exist" behave like the native implementation.
///
/// Uses `Arc<RwLock<_>>` so clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    project_root: PathBuf,
    tree: Arc<RwLock<Tree>>,
}

impl MemoryFileSystem {
    /// Create an empty filesystem rooted at `project_root` (e.g. "/project").
    pub fn new(project_root: impl AsRef<Path>) -> io::Result<Self> {
        let project_root = normalize(project_root.as_ref())?;
        let mut tree = Tree::default();
        tree.dirs.insert(project_root.clone());

        Ok(Self {
            project_root,
            tree: Arc::new(RwLock::new(tree)),
        })
    }

    /// Add a file, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> io::Result<()> {
        let normalized = self.validate_path(path.as_ref())?;
        let mut tree = self.tree.write();
        if let Some(parent) = normalized.parent() {
            insert_ancestors(&mut tree.dirs, parent, &self.project_root);
        }
        tree.files.insert(normalized, contents.into());
        Ok(())
    }

    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };
        let normalized = normalize(&absolute)?;

        if !normalized.starts_with(&self.project_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside {}",
                    normalized.display(),
                    self.project_root.display()
                ),
            ));
        }

        Ok(normalized)
    }

    fn ensure_parent(tree: &Tree, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if tree.dirs.contains(parent) => Ok(()),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", path.display()),
            )),
        }
    }
}

fn insert_ancestors(dirs: &mut BTreeSet<PathBuf>, dir: &Path, root: &Path) {
    let mut current = Some(dir);
    while let Some(path) = current {
        if !path.starts_with(root) || !dirs.insert(path.to_path_buf()) {
            break;
        }
        current = path.parent();
    }
}

/// Syntactic normalization; `..` may not climb above the filesystem root.
fn normalize(path: &Path) -> io::Result<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() || result.as_os_str().is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        "Path attempts to escape root using ..",
                    ));
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    Ok(result)
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("File not found: {}", path.display()),
    )
}

#[async_trait::async_trait]
impl FileSystem for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let normalized = self.validate_path(path)?;
        let tree = self.tree.read();
        Ok(tree.files.contains_key(&normalized) || tree.dirs.contains(&normalized))
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let normalized = self.validate_path(path)?;
        self.tree
            .read()
            .files
            .get(&normalized)
            .cloned()
            .ok_or_else(|| not_found(&normalized))
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let normalized = self.validate_path(path)?;
        let tree = self.tree.read();

        if let Some(contents) = tree.files.get(&normalized) {
            return Ok(FileMetadata {
                exists: true,
                is_file: true,
                is_dir: false,
                is_symlink: false,
                size: contents.len() as u64,
            });
        }
        if tree.dirs.contains(&normalized) {
            return Ok(FileMetadata {
                exists: true,
                is_file: false,
                is_dir: true,
                is_symlink: false,
                size: 0,
            });
        }
        Ok(FileMetadata::missing())
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.write_bytes(path, contents.as_bytes()).await
    }

    async fn write_bytes(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let normalized = self.validate_path(path)?;
        let mut tree = self.tree.write();
        Self::ensure_parent(&tree, &normalized)?;
        if tree.dirs.contains(&normalized) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Is a directory: {}", normalized.display()),
            ));
        }
        tree.files.insert(normalized, contents.to_vec());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let normalized = self.validate_path(path)?;
        self.tree
            .write()
            .files
            .remove(&normalized)
            .map(|_| ())
            .ok_or_else(|| not_found(&normalized))
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_normalized = self.validate_path(from)?;
        let to_normalized = self.validate_path(to)?;

        let mut tree = self.tree.write();
        Self::ensure_parent(&tree, &to_normalized)?;
        let contents = tree
            .files
            .remove(&from_normalized)
            .ok_or_else(|| not_found(&from_normalized))?;
        tree.files.insert(to_normalized, contents);
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let normalized = self.validate_path(path)?;
        let mut tree = self.tree.write();
        if tree.files.contains_key(&normalized) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("A file exists at {}", normalized.display()),
            ));
        }
        insert_ancestors(&mut tree.dirs, &normalized, &self.project_root);
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let normalized = self.validate_path(path)?;
        let tree = self.tree.read();
        if !tree.dirs.contains(&normalized) {
            return Err(not_found(&normalized));
        }

        let children: BTreeSet<PathBuf> = tree
            .files
            .keys()
            .chain(tree.dirs.iter())
            .filter(|p| p.parent() == Some(normalized.as_path()))
            .cloned()
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let normalized = self.validate_path(path)?;
        if normalized == self.project_root {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Refusing to remove the project root",
            ));
        }

        let mut tree = self.tree.write();
        if !tree.dirs.contains(&normalized) {
            return Err(not_found(&normalized));
        }
        tree.files.retain(|p, _| !p.starts_with(&normalized));
        tree.dirs.retain(|p| !p.starts_with(&normalized));
        Ok(())
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}
