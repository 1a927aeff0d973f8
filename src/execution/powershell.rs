//! PowerShell shell-out with WOW64 redirection handling.

use tracing::{debug, error};

use super::command::{build_powershell_command_with, ExecutionOptions, POWERSHELL_EXE};
use super::result::CommandResult;
use super::runner::{CommandRunner, ProcessRunner};
use crate::arch::{self, Architecture};
use crate::error::ShellOutError;
use crate::host::{Host, NativeHost};
use crate::redirection::RedirectionGuard;
use crate::Result;

/// Runs PowerShell scripts for a target architecture.
///
/// When the requested architecture differs from what a spawned process
/// would get by default on a 64-bit OS, filesystem redirection is disabled
/// around the spawn and restored afterwards, whatever the outcome.
///
/// Redirection is process-wide state: concurrent calls that need different
/// architectures must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct PowershellOut<H = NativeHost, R = ProcessRunner> {
    host: H,
    runner: R,
    executable: String,
}

impl PowershellOut {
    /// Create a facade for the running host using `std::process`.
    pub fn new() -> Self {
        Self::with_parts(NativeHost::new(), ProcessRunner::new())
    }
}

impl Default for PowershellOut {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host, R: CommandRunner> PowershellOut<H, R> {
    /// Compose a facade from a host and a runner.
    pub fn with_parts(host: H, runner: R) -> Self {
        Self {
            host,
            runner,
            executable: POWERSHELL_EXE.to_string(),
        }
    }

    /// Use a different PowerShell executable (e.g. `pwsh`).
    pub fn executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `script`; a non-zero exit is reported in the result.
    pub fn execute(&self, script: &str, options: ExecutionOptions) -> Result<CommandResult> {
        self.execute_with(script, options, false)
    }

    /// Run `script`, failing unless it exits with an accepted code.
    pub fn execute_checked(&self, script: &str, options: ExecutionOptions) -> Result<CommandResult> {
        self.execute_with(script, options, true)
    }

    fn execute_with(
        &self,
        script: &str,
        options: ExecutionOptions,
        checked: bool,
    ) -> Result<CommandResult> {
        let (requested, spawn) = options.into_parts();
        let architecture = requested.unwrap_or_else(|| arch::resolve(&self.host));

        let command = build_powershell_command_with(&self.executable, script);
        let toggle = arch::override_required(&self.host, architecture);
        debug!(%architecture, toggle, command = %command, "running powershell");

        let guard = if toggle {
            Some(RedirectionGuard::engage(&self.host)?)
        } else {
            None
        };

        let outcome = if checked {
            self.runner.run_checked(&command, &spawn)
        } else {
            self.runner.run(&command, &spawn)
        };

        let restored = guard.map_or(Ok(()), RedirectionGuard::restore);
        match (outcome, restored) {
            (Ok(result), Ok(())) => Ok(result),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                error!(error = %restore_err, "redirection restore failed after command error");
                Err(e)
            }
        }
    }

    /// Resolved default architecture for this host.
    pub fn default_architecture(&self) -> Architecture {
        arch::resolve(&self.host)
    }
}

impl<H, R> PowershellOut<H, R>
where
    H: Host + Clone + Send + 'static,
    R: CommandRunner + Clone + Send + 'static,
{
    /// Run [`execute`](Self::execute) on a blocking worker thread.
    ///
    /// The redirection toggle and the spawn happen on the same OS thread.
    pub async fn execute_async(
        &self,
        script: impl Into<String>,
        options: ExecutionOptions,
    ) -> Result<CommandResult> {
        self.spawn_execute(script.into(), options, false).await
    }

    /// Run [`execute_checked`](Self::execute_checked) on a blocking worker thread.
    pub async fn execute_checked_async(
        &self,
        script: impl Into<String>,
        options: ExecutionOptions,
    ) -> Result<CommandResult> {
        self.spawn_execute(script.into(), options, true).await
    }

    async fn spawn_execute(
        &self,
        script: String,
        options: ExecutionOptions,
        checked: bool,
    ) -> Result<CommandResult> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.execute_with(&script, options, checked))
            .await
            .map_err(|e| ShellOutError::TaskJoin(e.to_string()))?
    }
}
