//! # unblock-deps
//!
//! Blocker analysis and guarded updates for npm projects.
//!
//! This crate provides functionality to:
//! - Load `package.json` and `package-lock.json` into a [`PackageTable`]
//! - Build forward and reverse dependency indexes ([`DependencyGraph`])
//! - Resolve latest versions in two stages, only looking up the installed
//!   packages that could hold a top-level dependency back
//! - Classify each top-level dependency as safe, blocked or a major jump
//! - Turn the classification into a phased [`UpdatePlan`] and apply it with
//!   validation, backups and test runs around the package manager
//!
//! ## Example
//!
//! ```rust,no_run
//! use unblock_deps::{Analyzer, ProjectSnapshot};
//! use unblock_fs::NativeFileSystem;
//! use unblock_registry::{HttpClient, NpmRegistry, VersionCache, VersionResolver};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = NativeFileSystem::new(".")?;
//! let snapshot = ProjectSnapshot::load(&fs).await?;
//!
//! let client = HttpClient::with_rate_limit(10, Duration::from_secs(30))?;
//! let resolver = VersionResolver::new(NpmRegistry::new(client)?, VersionCache::default());
//! let result = Analyzer::new(resolver).analyze(&snapshot, None).await?;
//!
//! for dep in &result.blocked {
//!     println!("{} is held back by {:?}", dep.name(), dep.category.blocker_name());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod analysis;
pub mod backup;
pub mod checksum;
pub mod classify;
pub mod error;
pub mod graph;
pub mod npm;
pub mod plan;
pub mod runner;
pub mod types;
pub mod update;
pub mod validate;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use analysis::{AnalysisOptions, Analyzer, BLOCKER_STAGE, TOP_LEVEL_STAGE};
pub use backup::{BackedUpFile, BackupManager, BackupRecord};
pub use classify::{classify, LatestVersions};
pub use error::{Error, ErrorKind, Result};
pub use graph::DependencyGraph;
pub use npm::{ProjectFiles, ProjectSnapshot};
pub use plan::{preview_update, PackageUpdate, PhaseKind, PlanOptions, UpdatePhase, UpdatePlan};
pub use runner::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use types::{
    AnalysisResult, AnalysisStats, Category, ClassifiedDependency, PackageRecord, PackageTable,
};
pub use update::{
    AppliedUpdate, FailedUpdate, UpdateOptions, UpdateResult, UpdateStage, Updater,
};
pub use validate::{Severity, ValidationIssue, ValidationReport, Validator};
pub use version::{compare_versions, update_type, UpdateType};
