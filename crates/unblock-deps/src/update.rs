//! Guarded update workflow
//!
//! One [`Updater::update`] call moves through these stages, never
//! re-entering one:
//!
//! ```text
//! Validating -> BackingUp -> DryRunExit
//!                         -> TestingPre -> Applying -> ValidatingPost -> TestingPost -> Done
//! ```
//!
//! Error-severity pre-update findings and failing pre-update tests end the
//! run before anything is installed. Per-package failures are recorded and
//! the batch continues. Nothing is rolled back automatically; the backup
//! path is returned so the caller can restore it.

use crate::backup::BackupManager;
use crate::plan::{preview_update, PlanOptions, UpdatePlan};
use crate::runner::{CommandRunner, PackageManager, TestCommand};
use crate::types::AnalysisResult;
use crate::validate::{Severity, ValidationReport, Validator};
use crate::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use unblock_config::UpdateSettings;
use unblock_fs::FileSystem;

/// Switches for one update run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Stop after the backup and return the plan
    pub dry_run: bool,
    /// Back up the manifest and lockfile first
    pub backup: bool,
    /// Run the test command before and after installing
    pub run_tests: bool,
    /// Include `devDependencies`
    pub include_dev: bool,
    /// Only apply the `safe` phase
    pub safe_only: bool,
    /// Apply blocked packages too
    pub force: bool,
    /// Prune backups to this many afterwards
    pub keep_backups: Option<usize>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            backup: true,
            run_tests: false,
            include_dev: true,
            safe_only: false,
            force: false,
            keep_backups: None,
        }
    }
}

/// Stages of an update run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStage {
    /// Pre-update validation
    Validating,
    /// Backup creation
    BackingUp,
    /// Dry run stopped here
    DryRunExit,
    /// Tests before installing
    TestingPre,
    /// Package installs
    Applying,
    /// Post-update validation
    ValidatingPost,
    /// Tests after installing
    TestingPost,
    /// Finished
    Done,
}

impl std::fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::BackingUp => "backing-up",
            Self::DryRunExit => "dry-run-exit",
            Self::TestingPre => "testing-pre",
            Self::Applying => "applying",
            Self::ValidatingPost => "validating-post",
            Self::TestingPost => "testing-post",
            Self::Done => "done",
        })
    }
}

/// A package that was installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedUpdate {
    /// Package name
    pub name: String,
    /// Version before
    pub from: String,
    /// Version installed
    pub to: String,
}

/// A package whose install failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpdate {
    /// Package name
    pub name: String,
    /// Why it failed
    pub error: String,
}

/// Outcome of [`Updater::update`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// No package failed and no error-severity finding was reported
    pub success: bool,
    /// Run stopped before installing
    pub dry_run: bool,
    /// Installed packages
    pub updated: Vec<AppliedUpdate>,
    /// Packages whose install failed
    pub failed: Vec<FailedUpdate>,
    /// Blocked packages that were skipped
    pub blocked: Vec<String>,
    /// Backup taken before installing
    pub backup_path: Option<PathBuf>,
    /// Error messages from validation and tests
    pub errors: Vec<String>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
    /// The plan that was (or would have been) applied
    pub plan: UpdatePlan,
    /// Stages entered, in order
    pub stages: Vec<UpdateStage>,
}

impl UpdateResult {
    fn new(plan: UpdatePlan, dry_run: bool) -> Self {
        Self {
            success: false,
            dry_run,
            updated: Vec::new(),
            failed: Vec::new(),
            blocked: Vec::new(),
            backup_path: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            plan,
            stages: Vec::new(),
        }
    }

    fn enter(&mut self, stage: UpdateStage) {
        tracing::debug!(%stage, "entering stage");
        self.stages.push(stage);
    }

    fn absorb(&mut self, report: &ValidationReport) {
        self.errors.extend(report.messages(Severity::Error));
        self.warnings.extend(report.messages(Severity::Warning));
    }

    fn finish(mut self) -> Self {
        self.enter(UpdateStage::Done);
        self.success = self.failed.is_empty() && self.errors.is_empty();
        self
    }
}

/// Applies update plans to one project
pub struct Updater<F, R> {
    fs: Arc<F>,
    validator: Validator<F, R>,
    backups: BackupManager<F>,
    package_manager: PackageManager<R>,
    tests: TestCommand<R>,
}

impl<F: FileSystem, R: CommandRunner + Clone> Updater<F, R> {
    /// Updater for the project behind `fs`, configured by `settings`
    pub fn new(fs: Arc<F>, runner: R, settings: &UpdateSettings) -> Self {
        let root = fs.project_root().to_path_buf();
        Self {
            validator: Validator::new(fs.clone(), runner.clone()),
            backups: BackupManager::new(fs.clone(), &settings.backup_dir),
            package_manager: PackageManager::new(
                runner.clone(),
                settings.package_manager.clone(),
                &root,
                Duration::from_secs(settings.install_timeout_secs),
            ),
            tests: TestCommand::new(
                runner,
                settings.test_command.clone(),
                &root,
                Duration::from_secs(settings.test_timeout_secs),
            ),
            fs,
        }
    }

    /// Backups of this project
    pub fn backups(&self) -> &BackupManager<F> {
        &self.backups
    }

    /// Plan the updates for `selected` (all when empty) and apply them.
    ///
    /// # Errors
    /// Only structural failures: a backup that cannot be written or a plan
    /// that cannot be built. Validation and install problems are reported
    /// in the returned [`UpdateResult`].
    pub async fn update(
        &self,
        analysis: &AnalysisResult,
        selected: &[String],
        options: &UpdateOptions,
    ) -> Result<UpdateResult> {
        let plan_options = PlanOptions {
            safe_only: options.safe_only,
            include_dev: options.include_dev,
        };
        let plan = preview_update(analysis, &plan_options).select(selected);
        let mut result = UpdateResult::new(plan, options.dry_run);

        tracing::info!(
            project = %self.fs.project_root().display(),
            packages = result.plan.len(),
            dry_run = options.dry_run,
            "starting update"
        );

        result.enter(UpdateStage::Validating);
        let report = self.validator.pre_update().await;
        result.warnings.extend(report.messages(Severity::Warning));
        if let Err(e) = report.into_result("pre-update") {
            tracing::warn!(error = %e, "nothing was changed");
            result.errors.push(e.to_string());
            return Ok(result.finish());
        }

        result.enter(UpdateStage::BackingUp);
        if options.backup {
            let record = self.backups.create().await?;
            result.backup_path = Some(record.path);
        }

        result.blocked = result
            .plan
            .updates()
            .filter(|u| u.is_blocked() && !options.force)
            .map(|u| u.name.clone())
            .collect();

        if options.dry_run {
            result.enter(UpdateStage::DryRunExit);
            return Ok(result.finish());
        }

        if options.run_tests {
            result.enter(UpdateStage::TestingPre);
            if let Err(message) = self.run_tests().await {
                result.errors.push(format!("pre-update tests failed: {message}"));
                return Ok(result.finish());
            }
        }

        result.enter(UpdateStage::Applying);
        let updates: Vec<_> = result.plan.updates().cloned().collect();
        for update in updates {
            if update.is_blocked() && !options.force {
                tracing::info!(package = %update.name, "skipping blocked package");
                continue;
            }
            match self
                .package_manager
                .install(&update.name, &update.target_version, update.is_dev)
                .await
            {
                Ok(()) => {
                    tracing::info!("updated {}", update.spec());
                    result.updated.push(AppliedUpdate {
                        name: update.name,
                        from: update.current_version,
                        to: update.target_version,
                    });
                }
                Err(e) => {
                    tracing::warn!(package = %update.name, error = %e, "update failed");
                    result.failed.push(FailedUpdate {
                        name: update.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        result.enter(UpdateStage::ValidatingPost);
        let report = self.validator.post_update().await;
        result.absorb(&report);

        if options.run_tests {
            result.enter(UpdateStage::TestingPost);
            if let Err(message) = self.run_tests().await {
                result.errors.push(format!("post-update tests failed: {message}"));
            }
        }

        if let Some(keep) = options.keep_backups {
            if let Err(e) = self.backups.cleanup(keep).await {
                result.warnings.push(format!("backup cleanup failed: {e}"));
            }
        }

        let result = result.finish();
        if !result.success {
            if let Some(path) = &result.backup_path {
                tracing::warn!("update incomplete; backup available at {}", path.display());
            }
        }
        Ok(result)
    }

    async fn run_tests(&self) -> std::result::Result<(), String> {
        match self.tests.run().await {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(output.summary()),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::graph::DependencyGraph;
    use crate::npm::ProjectSnapshot;
    use crate::testing::ScriptedRunner;
    use std::path::Path;
    use unblock_fs::MemoryFileSystem;
    use unblock_registry::LatestVersion;

    const MANIFEST: &str = r#"{
        "dependencies": {
            "react": "^18.0.0",
            "lodash": "^4.1.0",
            "typescript": "^4.0.0"
        },
        "devDependencies": { "vitest": "^1.0.0" }
    }"#;

    const LOCKFILE: &str = r#"{
        "lockfileVersion": 3,
        "packages": {
            "": {},
            "node_modules/react": { "version": "18.2.0" },
            "node_modules/lodash": { "version": "4.1.0" },
            "node_modules/typescript": { "version": "4.9.5" },
            "node_modules/vitest": { "version": "1.0.0", "dev": true },
            "node_modules/old-ui-kit": {
                "version": "1.0.0",
                "dependencies": { "react": "^18.0.0" }
            }
        }
    }"#;

    fn project(lockfile: Option<&str>) -> Arc<MemoryFileSystem> {
        let fs = MemoryFileSystem::new("/project").unwrap();
        fs.add_file("package.json", MANIFEST).unwrap();
        if let Some(lockfile) = lockfile {
            fs.add_file("package-lock.json", lockfile).unwrap();
        }
        Arc::new(fs)
    }

    fn analysis() -> AnalysisResult {
        let snapshot = ProjectSnapshot::from_contents(MANIFEST, LOCKFILE).unwrap();
        let graph = DependencyGraph::build(&snapshot.table);
        let latest = [
            ("react", "19.0.0"),
            ("lodash", "4.2.0"),
            ("typescript", "5.4.0"),
            ("vitest", "1.6.0"),
            ("old-ui-kit", "1.0.0"),
        ]
        .into_iter()
        .map(|(name, v)| (name.to_string(), LatestVersion::Known(v.to_string())))
        .collect();
        classify(&snapshot.table, &graph, &latest)
    }

    fn updater(
        fs: Arc<MemoryFileSystem>,
        runner: Arc<ScriptedRunner>,
    ) -> Updater<MemoryFileSystem, Arc<ScriptedRunner>> {
        Updater::new(fs, runner, &UpdateSettings::default())
    }

    #[tokio::test]
    async fn test_applies_plan_in_order_and_skips_blocked() {
        let runner = Arc::new(ScriptedRunner::new());
        let result = updater(project(Some(LOCKFILE)), runner.clone())
            .update(&analysis(), &[], &UpdateOptions::default())
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.blocked, ["react"]);
        assert_eq!(
            runner.calls_matching("npm install"),
            [
                "npm install lodash@4.2.0",
                "npm install vitest@1.6.0 --save-dev",
                "npm install typescript@5.4.0",
            ]
        );
        assert_eq!(
            result.updated[0],
            AppliedUpdate {
                name: "lodash".into(),
                from: "4.1.0".into(),
                to: "4.2.0".into()
            }
        );
        assert!(result.backup_path.is_some());
        assert_eq!(
            result.stages,
            [
                UpdateStage::Validating,
                UpdateStage::BackingUp,
                UpdateStage::Applying,
                UpdateStage::ValidatingPost,
                UpdateStage::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_force_applies_blocked() {
        let runner = Arc::new(ScriptedRunner::new());
        let options = UpdateOptions {
            force: true,
            ..UpdateOptions::default()
        };
        let result = updater(project(Some(LOCKFILE)), runner.clone())
            .update(&analysis(), &["react".to_string()], &options)
            .await
            .unwrap();

        assert!(result.blocked.is_empty());
        assert_eq!(runner.calls_matching("npm install"), ["npm install react@19.0.0"]);
    }

    #[tokio::test]
    async fn test_dry_run_never_installs() {
        let fs = project(Some(LOCKFILE));
        let runner = Arc::new(ScriptedRunner::new());
        let options = UpdateOptions {
            dry_run: true,
            run_tests: true,
            ..UpdateOptions::default()
        };
        let result = updater(fs.clone(), runner.clone())
            .update(&analysis(), &[], &options)
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.dry_run);
        assert_eq!(result.plan.len(), 4);
        assert!(result.updated.is_empty());
        assert!(runner.calls_matching("npm").is_empty());
        assert_eq!(result.stages.last(), Some(&UpdateStage::Done));
        assert!(result.stages.contains(&UpdateStage::DryRunExit));

        let backup = result.backup_path.unwrap();
        assert!(fs.exists(&backup.join("package.json")).await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let runner = Arc::new(ScriptedRunner::new().with_failure("lodash@", "npm ERR! 404"));
        let result = updater(project(Some(LOCKFILE)), runner.clone())
            .update(&analysis(), &[], &UpdateOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].name, "lodash");
        assert!(result.failed[0].error.contains("npm ERR! 404"));
        assert_eq!(result.updated.len(), 2);
    }

    #[tokio::test]
    async fn test_pre_validation_error_aborts_before_backup() {
        let fs = project(None);
        let runner = Arc::new(ScriptedRunner::new());
        let result = updater(fs.clone(), runner.clone())
            .update(&analysis(), &[], &UpdateOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors[0].starts_with("pre-update validation failed"));
        assert!(result.errors[0].contains("package-lock.json"));
        assert!(result.backup_path.is_none());
        assert!(runner.calls_matching("npm").is_empty());
        assert!(!fs.exists(Path::new(".unblock")).await.unwrap());
        assert_eq!(result.stages, [UpdateStage::Validating, UpdateStage::Done]);
    }

    #[tokio::test]
    async fn test_failing_pre_tests_abort() {
        let runner = Arc::new(ScriptedRunner::new().with_failure("npm test", "1 failing"));
        let options = UpdateOptions {
            run_tests: true,
            ..UpdateOptions::default()
        };
        let result = updater(project(Some(LOCKFILE)), runner.clone())
            .update(&analysis(), &[], &options)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.errors, ["pre-update tests failed: 1 failing"]);
        assert!(runner.calls_matching("npm install").is_empty());
    }

    #[tokio::test]
    async fn test_post_validation_failure_keeps_files_and_backup() {
        // the lockfile still has react 17 after "installing", violating ^18
        let stale = LOCKFILE.replace("18.2.0", "17.0.2");
        let fs = project(Some(&stale));
        let runner = Arc::new(ScriptedRunner::new());
        let result = updater(fs.clone(), runner)
            .update(&analysis(), &["lodash".to_string()], &UpdateOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors[0].contains("react@17.0.2"));
        assert_eq!(result.updated.len(), 1);
        let backup = result.backup_path.unwrap();
        assert!(fs.exists(&backup).await.unwrap());
        assert_eq!(
            fs.read_to_string(Path::new("package-lock.json")).await.unwrap(),
            stale
        );
    }

    #[tokio::test]
    async fn test_keep_backups_prunes() {
        let fs = project(Some(LOCKFILE));
        let runner = Arc::new(ScriptedRunner::new());
        let updater = updater(fs, runner);
        let options = UpdateOptions {
            keep_backups: Some(1),
            ..UpdateOptions::default()
        };

        for _ in 0..3 {
            updater.update(&analysis(), &[], &options).await.unwrap();
        }
        assert_eq!(updater.backups().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_backup_when_disabled() {
        let runner = Arc::new(ScriptedRunner::new());
        let options = UpdateOptions {
            backup: false,
            ..UpdateOptions::default()
        };
        let result = updater(project(Some(LOCKFILE)), runner)
            .update(&analysis(), &[], &options)
            .await
            .unwrap();
        assert!(result.backup_path.is_none());
    }
}
