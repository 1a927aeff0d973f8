//! Error types for powershell-out.

use std::time::Duration;

use thiserror::Error;

/// Main error type for shell-out operations.
#[derive(Error, Debug)]
pub enum ShellOutError {
    /// The command ran to completion with an exit status outside the
    /// accepted set.
    #[error("command failed with {}: {command}", describe_exit(.exit_code))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The subprocess could not be started.
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Querying or changing the filesystem redirection mode failed.
    #[error("filesystem redirection toggle failed: {0}")]
    RedirectionToggleFailed(String),

    /// The command exceeded its caller-supplied timeout.
    #[error("command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    /// I/O error while talking to a running subprocess.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task could not be joined.
    #[error("task join error: {0}")]
    TaskJoin(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

/// Convenience Result type for shell-out operations.
pub type Result<T> = std::result::Result<T, ShellOutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = ShellOutError::CommandFailed {
            command: "powershell.exe -Command \"exit 3\"".into(),
            exit_code: Some(3),
            stdout: String::new(),
            stderr: "boom".into(),
        };
        assert!(err.to_string().contains("exit code 3"));
        assert!(err.to_string().contains("exit 3"));
    }

    #[test]
    fn test_command_failed_without_code() {
        let err = ShellOutError::CommandFailed {
            command: "x".into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("no exit code"));
    }

    #[test]
    fn test_spawn_failed_keeps_source() {
        use std::error::Error as _;

        let err = ShellOutError::SpawnFailed {
            program: "powershell.exe".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("powershell.exe"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ShellOutError = io_err.into();
        assert!(matches!(err, ShellOutError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_redirection_display() {
        let err = ShellOutError::RedirectionToggleFailed("access denied".into());
        assert!(err.to_string().contains("redirection"));
        assert!(err.to_string().contains("access denied"));
    }
}
