//! Scripted command runner for tests (enabled with the `test-utils` feature)

use crate::runner::{command_line, CommandOutput, CommandRunner};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    Timeout,
}

/// [`CommandRunner`] that never spawns a process.
///
/// Each invocation is recorded as its full command line. The first rule
/// whose pattern is a substring of the command line decides the response;
/// unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Response)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Runner where every command succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` succeed with `stdout`
    pub fn with_output(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules
            .push((pattern.to_string(), Response::Output(CommandOutput::ok(stdout))));
        self
    }

    /// Commands containing `pattern` exit with status 1 and `stderr`
    pub fn with_failure(mut self, pattern: &str, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Output(CommandOutput::failed(1, stderr)),
        ));
        self
    }

    /// Commands containing `pattern` time out
    pub fn with_timeout(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Response::Timeout));
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Command lines containing `pattern`
    pub fn calls_matching(&self, pattern: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.contains(pattern))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let line = command_line(program, args);
        self.calls.lock().push(line.clone());

        let response = self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            Some(Response::Output(output)) => Ok(output),
            Some(Response::Timeout) => Err(Error::CommandTimeout {
                command: line,
                timeout,
            }),
            None => Ok(CommandOutput::ok("")),
        }
    }
}
