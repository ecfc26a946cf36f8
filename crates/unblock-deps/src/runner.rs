//! External commands: package manager installs, test runs, git status

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Whether the process exited with status 0
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Last non-empty line of stderr (or stdout), for short error messages
    pub fn summary(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        text.lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| match self.code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            })
    }
}

/// Runs external programs. Injected so tests never spawn processes.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args…` in `cwd`, failing with
    /// [`Error::CommandTimeout`] after `timeout`.
    ///
    /// A non-zero exit is not an error; check [`CommandOutput::success`].
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

#[async_trait::async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        (**self).run(program, args, cwd, timeout).await
    }
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait::async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let command_line = command_line(program, args);
        tracing::debug!(cwd = %cwd.display(), "executing: {}", command_line);
        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| Error::Command {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                tracing::warn!(
                    "command timed out after {} seconds: {}",
                    timeout.as_secs(),
                    command_line
                );
                return Err(Error::CommandTimeout {
                    command: command_line,
                    timeout,
                });
            }
        };

        let output = CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            code = ?output.code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finished: {}",
            command_line
        );
        if !output.success && !output.stderr.is_empty() {
            tracing::debug!("{}", output.stderr.trim());
        }

        Ok(output)
    }
}

pub(crate) fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arguments for installing `name@version`
pub fn install_args(name: &str, version: &str, dev: bool) -> Vec<String> {
    let mut args = vec!["install".to_string(), format!("{name}@{version}")];
    if dev {
        args.push("--save-dev".to_string());
    }
    args
}

/// Installs single packages through the configured package manager
pub struct PackageManager<R> {
    runner: R,
    program: String,
    project_root: PathBuf,
    timeout: Duration,
}

impl<R: CommandRunner> PackageManager<R> {
    /// Package manager `program` (e.g. `npm`) operating in `project_root`
    pub fn new(
        runner: R,
        program: impl Into<String>,
        project_root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            project_root: project_root.into(),
            timeout,
        }
    }

    /// Install `name@version`, saving to devDependencies when `dev`.
    ///
    /// # Errors
    /// [`Error::Apply`] when the package manager exits unsuccessfully.
    pub async fn install(&self, name: &str, version: &str, dev: bool) -> Result<()> {
        let args = install_args(name, version, dev);
        let output = self
            .runner
            .run(&self.program, &args, &self.project_root, self.timeout)
            .await?;

        if output.success {
            Ok(())
        } else {
            Err(Error::Apply {
                package: name.to_string(),
                message: output.summary(),
            })
        }
    }
}

/// The project's test command
pub struct TestCommand<R> {
    runner: R,
    command: Vec<String>,
    project_root: PathBuf,
    timeout: Duration,
}

impl<R: CommandRunner> TestCommand<R> {
    /// `command` is the program followed by its arguments
    pub fn new(
        runner: R,
        command: Vec<String>,
        project_root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            command,
            project_root: project_root.into(),
            timeout,
        }
    }

    /// Run the tests; `Ok(output)` even when they fail
    pub async fn run(&self) -> Result<CommandOutput> {
        let Some((program, args)) = self.command.split_first() else {
            return Ok(CommandOutput::ok(""));
        };
        self.runner
            .run(program, args, &self.project_root, self.timeout)
            .await
    }
}

/// `git status --porcelain` for the given files.
///
/// Returns `None` when git is unavailable or the project is not a repository.
pub async fn uncommitted_changes<R: CommandRunner>(
    runner: &R,
    project_root: &Path,
    files: &[&str],
) -> Option<Vec<String>> {
    let mut args = vec!["status".to_string(), "--porcelain".to_string(), "--".to_string()];
    args.extend(files.iter().map(|f| f.to_string()));

    match runner
        .run("git", &args, project_root, Duration::from_secs(30))
        .await
    {
        Ok(output) if output.success => Some(
            output
                .stdout
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Ok(output) => {
            tracing::debug!("git status unavailable: {}", output.summary());
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "git status unavailable");
            None
        }
    }
}
