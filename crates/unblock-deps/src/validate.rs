//! Pre- and post-update project checks

use crate::npm::{Lockfile, Manifest, ProjectSnapshot, LOCKFILE_FILE, MANIFEST_FILE};
use crate::runner::{uncommitted_changes, CommandRunner};
use crate::version::{parse_range, parse_version};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use unblock_fs::FileSystem;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, does not stop the update
    Warning,
    /// Stops the current stage
    Error,
}

/// One finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Seriousness
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

/// All findings of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Findings in discovery order
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn error(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    /// Whether any finding has error severity
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Messages with the given severity
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .map(|i| i.message.clone())
            .collect()
    }

    /// `Err(Error::Validation)` when the report has errors
    pub fn into_result(self, stage: &str) -> Result<Self> {
        if self.has_errors() {
            Err(Error::Validation {
                stage: stage.to_string(),
                issues: self.messages(Severity::Error),
            })
        } else {
            Ok(self)
        }
    }
}

/// Checks a project before and after updates
pub struct Validator<F, R> {
    fs: Arc<F>,
    runner: R,
}

impl<F: FileSystem, R: CommandRunner> Validator<F, R> {
    /// Validator over `fs`, using `runner` for git
    pub fn new(fs: Arc<F>, runner: R) -> Self {
        Self { fs, runner }
    }

    /// Manifest and lockfile readable and well-formed (errors), top-level
    /// dependencies present in the lockfile and no uncommitted changes to
    /// either file (warnings).
    pub async fn pre_update(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if let Some(snapshot) = self.load(&mut report).await {
            for name in &snapshot.not_installed {
                report.warning(format!(
                    "{name} is declared in {MANIFEST_FILE} but missing from {LOCKFILE_FILE}"
                ));
            }
        }

        let root = self.fs.project_root();
        if let Some(changes) =
            uncommitted_changes(&self.runner, root, &[MANIFEST_FILE, LOCKFILE_FILE]).await
        {
            if !changes.is_empty() {
                report.warning(format!(
                    "uncommitted changes: {}",
                    changes
                        .iter()
                        .map(|c| c.trim())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        tracing::debug!(issues = report.issues.len(), "pre-update validation");
        report
    }

    /// Both files parse (errors), installed top-level versions satisfy
    /// their manifest ranges (errors) and installed peer ranges hold
    /// (warnings).
    pub async fn post_update(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if let Some(snapshot) = self.load(&mut report).await {
            check_requested_ranges(&snapshot, &mut report);
            check_peer_ranges(&snapshot, &mut report);
        }

        tracing::debug!(issues = report.issues.len(), "post-update validation");
        report
    }

    async fn load(&self, report: &mut ValidationReport) -> Option<ProjectSnapshot> {
        let root = self.fs.project_root();
        let manifest = self
            .read_parsed(&root.join(MANIFEST_FILE), report, Manifest::parse)
            .await;
        let lockfile = self
            .read_parsed(&root.join(LOCKFILE_FILE), report, Lockfile::parse)
            .await;

        match ProjectSnapshot::from_parts(manifest?, lockfile?) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                report.error(e.to_string());
                None
            }
        }
    }

    async fn read_parsed<T>(
        &self,
        path: &Path,
        report: &mut ValidationReport,
        parse: fn(&Path, &str) -> Result<T>,
    ) -> Option<T> {
        let content = match self.fs.read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                report.error(Error::file_access(path, e).to_string());
                return None;
            }
        };
        match parse(path, &content) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                report.error(e.to_string());
                None
            }
        }
    }
}

fn check_requested_ranges(snapshot: &ProjectSnapshot, report: &mut ValidationReport) {
    for record in snapshot.table.top_level() {
        let Some(requested) = record.requested_range.as_deref() else {
            continue;
        };
        let (Ok(range), Ok(version)) = (
            parse_range(requested),
            parse_version(&record.resolved_version),
        ) else {
            continue;
        };
        if !range.satisfies(&version) {
            report.error(format!(
                "{}@{} does not satisfy {} from {MANIFEST_FILE}",
                record.name, record.resolved_version, requested
            ));
        }
    }
}

fn check_peer_ranges(snapshot: &ProjectSnapshot, report: &mut ValidationReport) {
    for record in snapshot.table.iter() {
        for (peer, requested) in &record.peer_dependency_ranges {
            let Some(installed) = snapshot.table.get(peer) else {
                continue;
            };
            let (Ok(range), Ok(version)) =
                (parse_range(requested), parse_version(&installed.resolved_version))
            else {
                continue;
            };
            if !range.satisfies(&version) {
                report.warning(format!(
                    "{} expects peer {} {} but {} is installed",
                    record.name, peer, requested, installed.resolved_version
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use unblock_fs::MemoryFileSystem;

    const MANIFEST: &str = r#"{ "dependencies": { "react": "^18.0.0", "zod": "^3.0.0" } }"#;

    fn lockfile(react: &str) -> String {
        format!(
            r#"{{
                "lockfileVersion": 3,
                "packages": {{
                    "": {{}},
                    "node_modules/react": {{ "version": "{react}" }},
                    "node_modules/old-modal": {{
                        "version": "1.0.0",
                        "peerDependencies": {{ "react": "^17.0.0" }}
                    }}
                }}
            }}"#
        )
    }

    fn project(manifest: Option<&str>, lockfile: Option<&str>) -> Arc<MemoryFileSystem> {
        let fs = MemoryFileSystem::new("/project").unwrap();
        if let Some(manifest) = manifest {
            fs.add_file("package.json", manifest).unwrap();
        }
        if let Some(lockfile) = lockfile {
            fs.add_file("package-lock.json", lockfile).unwrap();
        }
        Arc::new(fs)
    }

    #[tokio::test]
    async fn test_pre_update_warnings_only() {
        let fs = project(Some(MANIFEST), Some(&lockfile("18.2.0")));
        let runner = ScriptedRunner::new().with_output("git status", " M package.json\n");
        let report = Validator::new(fs, runner).pre_update().await;

        assert!(!report.has_errors());
        let warnings = report.messages(Severity::Warning);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("zod"));
        assert!(warnings[1].contains("M package.json"));
    }

    #[tokio::test]
    async fn test_pre_update_missing_lockfile_is_error() {
        let fs = project(Some(MANIFEST), None);
        let report = Validator::new(fs, ScriptedRunner::new()).pre_update().await;

        assert!(report.has_errors());
        assert!(report.messages(Severity::Error)[0].contains("package-lock.json"));
        assert!(report.clone().into_result("pre-update").is_err());
    }

    #[tokio::test]
    async fn test_pre_update_malformed_manifest_is_error() {
        let fs = project(Some("{ oops"), Some(&lockfile("18.2.0")));
        let report = Validator::new(fs, ScriptedRunner::new()).pre_update().await;
        assert!(report.has_errors());
    }

    #[tokio::test]
    async fn test_git_unavailable_is_ignored() {
        let fs = project(Some(MANIFEST), Some(&lockfile("18.2.0")));
        let runner = ScriptedRunner::new().with_failure("git", "fatal: not a git repository");
        let report = Validator::new(fs, runner).pre_update().await;
        assert_eq!(report.messages(Severity::Warning).len(), 1);
    }

    #[tokio::test]
    async fn test_post_update_checks_ranges() {
        let fs = project(Some(MANIFEST), Some(&lockfile("17.0.2")));
        let report = Validator::new(fs, ScriptedRunner::new()).post_update().await;

        let errors = report.messages(Severity::Error);
        assert_eq!(errors, ["react@17.0.2 does not satisfy ^18.0.0 from package.json"]);
        assert!(report.messages(Severity::Warning).is_empty());
    }

    #[tokio::test]
    async fn test_post_update_peer_violation_is_warning() {
        let fs = project(Some(MANIFEST), Some(&lockfile("18.3.0")));
        let report = Validator::new(fs, ScriptedRunner::new()).post_update().await;

        assert!(!report.has_errors());
        assert_eq!(
            report.messages(Severity::Warning),
            ["old-modal expects peer react ^17.0.0 but 18.3.0 is installed"]
        );
    }
}
