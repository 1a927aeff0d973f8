//! Command result types.

use std::time::Duration;

use crate::error::ShellOutError;
use crate::Result;

/// Outcome of one subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Rendered command line that produced this result.
    pub command: String,
    /// Exit code (None if killed or terminated by a signal).
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Execution duration.
    pub duration: Duration,
    /// Whether execution timed out.
    pub timed_out: bool,
    /// Timeout the command ran under, if any.
    pub timeout: Option<Duration>,
    /// Exit codes treated as success.
    pub valid_exit_codes: Vec<i32>,
}

impl CommandResult {
    /// Create a result for a process that ran to completion.
    pub fn new(command: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            command: command.into(),
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            timed_out: false,
            timeout: None,
            valid_exit_codes: vec![0],
        }
    }

    /// Create a result indicating timeout.
    pub fn timeout(command: impl Into<String>, duration: Duration) -> Self {
        Self {
            duration,
            timed_out: true,
            ..Self::new(command, None)
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record the configured timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the exit codes treated as success.
    pub fn with_valid_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.valid_exit_codes = codes.into_iter().collect();
        self
    }

    /// Check if the command succeeded.
    pub fn success(&self) -> bool {
        !self.timed_out
            && self
                .exit_code
                .is_some_and(|code| self.valid_exit_codes.contains(&code))
    }

    /// Check if the command failed (unaccepted exit code, no exit code, or timeout).
    pub fn failed(&self) -> bool {
        !self.success()
    }

    /// Turn a failed result into the matching error.
    ///
    /// A timeout reports the configured limit, falling back to the elapsed
    /// time when none was recorded.
    pub fn ensure_success(&self) -> Result<()> {
        if self.success() {
            return Ok(());
        }
        if self.timed_out {
            return Err(ShellOutError::Timeout {
                command: self.command.clone(),
                timeout: self.timeout.unwrap_or(self.duration),
            });
        }
        Err(ShellOutError::CommandFailed {
            command: self.command.clone(),
            exit_code: self.exit_code,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        })
    }

    /// Get stdout, trimmed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stdout lines.
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}
