//! External command execution.
//!
//! Collectors never spawn processes directly; they go through a
//! [`CommandRunner`] so tests can feed canned package-manager output and the
//! agent can bound every subprocess with a timeout and a cancellation token.

use async_trait::async_trait;
use hostinv_core::{InventoryError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default budget for one subprocess
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Captured result of one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Entire standard output, lossily decoded as UTF-8
    pub stdout: String,
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Output of a command that exited with code 0
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
        }
    }

    /// Returns true if the command exited with code 0
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Returns true if the command wrote anything besides whitespace
    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty()
    }
}

/// Capability to run external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Returns true if `program` is present on this host
    fn exists(&self, program: &str) -> bool;

    /// Run `program` to completion and capture its standard output.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`], not
    /// as an error. Errors mean the program could not be run at all, ran out
    /// of time, or was cancelled.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput>;
}

/// Runs real processes with `tokio::process`
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl SystemRunner {
    /// Create a runner with the given per-command timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Per-command timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    fn exists(&self, program: &str) -> bool {
        Path::new(program).is_file()
    }

    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        debug!(program, ?args, "running command");

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        // Dropping the output future drops the child, which kills it.
        let output = command.output();

        let result = tokio::select! {
            () = cancel.cancelled() => return Err(InventoryError::Cancelled),
            result = tokio::time::timeout(self.timeout, output) => result,
        };

        let output = result
            .map_err(|_| InventoryError::Timeout {
                operation: program.to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| InventoryError::collection(program, e))?;

        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_code: output.status.code(),
        };
        debug!(
            program,
            exit_code = ?captured.exit_code,
            bytes = captured.stdout.len(),
            "command finished"
        );
        Ok(captured)
    }
}

#[derive(Debug, Clone)]
enum CannedResponse {
    Output(CommandOutput),
    Fails(String),
}

/// Runner that replays fixed output per program.
///
/// Programs without a canned response do not "exist" and fail to run.
#[derive(Debug, Clone, Default)]
pub struct CannedRunner {
    responses: HashMap<String, CannedResponse>,
}

impl CannedRunner {
    /// Create a runner that knows no programs
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `program` with `stdout` and exit code 0
    #[must_use]
    pub fn with_output(self, program: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.with_exit(program, stdout, 0)
    }

    /// Answer `program` with `stdout` and the given exit code
    #[must_use]
    pub fn with_exit(
        mut self,
        program: impl Into<String>,
        stdout: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        self.responses.insert(
            program.into(),
            CannedResponse::Output(CommandOutput {
                stdout: stdout.into(),
                exit_code: Some(exit_code),
            }),
        );
        self
    }

    /// Make `program` present but impossible to execute
    #[must_use]
    pub fn with_failure(mut self, program: impl Into<String>, reason: impl Into<String>) -> Self {
        self.responses
            .insert(program.into(), CannedResponse::Fails(reason.into()));
        self
    }
}

#[async_trait]
impl CommandRunner for CannedRunner {
    fn exists(&self, program: &str) -> bool {
        self.responses.contains_key(program)
    }

    async fn run(
        &self,
        program: &str,
        _args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        if cancel.is_cancelled() {
            return Err(InventoryError::Cancelled);
        }
        match self.responses.get(program) {
            Some(CannedResponse::Output(output)) => Ok(output.clone()),
            Some(CannedResponse::Fails(reason)) => Err(InventoryError::collection(program, reason)),
            None => Err(InventoryError::collection(program, "program not found")),
        }
    }
}
