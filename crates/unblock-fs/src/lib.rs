//! Project-scoped filesystem abstraction for unblock.
//!
//! Everything that touches the manifest, the lockfile or the backup directory
//! goes through the [`FileSystem`] trait. Two implementations are provided:
//!
//! - [`NativeFileSystem`]: real disk access, offloaded to tokio's blocking pool
//! - [`MemoryFileSystem`]: in-memory tree, used by tests and dry analyses
//!
//! Both refuse to touch paths outside the project root they were created for.
//!
//! # Example
//!
//! ```no_run
//! use unblock_fs::{FileSystem, NativeFileSystem};
//! use std::sync::Arc;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let fs = Arc::new(NativeFileSystem::new(".")?);
//! let manifest = fs.read_to_string(Path::new("package.json")).await?;
//! println!("{}", manifest);
//! # Ok(())
//! # }
//! ```

mod file_system;
pub use file_system::{FileMetadata, FileSystem};

pub mod memory;
pub use memory::MemoryFileSystem;

pub mod native;
pub use native::NativeFileSystem;

pub use NativeFileSystem as DefaultFileSystem;
