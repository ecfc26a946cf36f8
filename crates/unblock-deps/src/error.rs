//! Error types for unblock-deps

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using unblock-deps Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in unblock-deps
#[derive(Debug, Error)]
pub enum Error {
    /// package.json is not valid JSON or has the wrong shape
    #[error("Malformed manifest {path}: {message}")]
    MalformedManifest {
        /// File the content came from
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// package-lock.json is not valid JSON or has the wrong shape
    #[error("Malformed lockfile {path}: {message}")]
    MalformedLockfile {
        /// File the content came from
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A file exists but could not be read or written
    #[error("Cannot access {path}: {source}")]
    FileAccess {
        /// Offending path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A required file is missing
    #[error("Required file not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid version or version range
    #[error("Invalid version '{0}': {1}")]
    InvalidVersion(String, String),

    /// A registry stage could not start at all
    #[error("Version resolution failed during {stage} stage: {source}")]
    Resolution {
        /// Stage label (`top-level` or `blockers`)
        stage: String,
        /// Registry error
        #[source]
        source: unblock_registry::Error,
    },

    /// Validation found error-severity problems
    #[error("{stage} validation failed: {}", issues.join("; "))]
    Validation {
        /// `pre-update` or `post-update`
        stage: String,
        /// Error messages
        issues: Vec<String>,
    },

    /// A single package could not be updated
    #[error("Failed to update {package}: {message}")]
    Apply {
        /// Package name
        package: String,
        /// Package manager output or reason
        message: String,
    },

    /// An external program could not be started
    #[error("Failed to run {program}: {source}")]
    Command {
        /// Program name
        program: String,
        /// Spawn error
        #[source]
        source: std::io::Error,
    },

    /// An external program ran past its time limit
    #[error("Command timed out after {}s: {command}", timeout.as_secs())]
    CommandTimeout {
        /// Full command line
        command: String,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// A backup could not be restored
    #[error("Cannot restore backup {path}: {message}")]
    Restore {
        /// Backup directory
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`Error`] for user-facing remediation hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Manifest or lockfile could not be parsed
    MalformedInput,
    /// A file could not be read or written
    FileAccess,
    /// The registry could not be used at all
    Resolution,
    /// Pre/post update checks failed
    Validation,
    /// Applying an update failed
    Apply,
    /// Restoring a backup failed
    Restore,
    /// Settings are invalid; raised by `unblock-config`, never by [`Error::kind`]
    Config,
}

impl Error {
    /// Which [`ErrorKind`] this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedManifest { .. }
            | Self::MalformedLockfile { .. }
            | Self::InvalidVersion(..)
            | Self::Json(_) => ErrorKind::MalformedInput,
            Self::FileAccess { .. } | Self::FileNotFound(_) => ErrorKind::FileAccess,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Apply { .. } | Self::Command { .. } | Self::CommandTimeout { .. } => {
                ErrorKind::Apply
            }
            Self::Restore { .. } => ErrorKind::Restore,
        }
    }

    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.into())
        } else {
            Self::FileAccess {
                path: path.into(),
                source,
            }
        }
    }

    pub(crate) fn restore(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Restore {
            path: path.into(),
            message: message.into(),
        }
    }
}
