//! Subprocess execution.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::command::{CommandLine, SpawnOptions};
use super::process_group::{self, ProcessTree};
use super::result::CommandResult;
use crate::error::ShellOutError;
use crate::Result;

/// How often a child is polled while a timeout is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs a command line to completion.
pub trait CommandRunner {
    /// Run the command and capture its result.
    ///
    /// A non-zero exit status is reported in the result, never as an error.
    fn run(&self, command: &CommandLine, options: &SpawnOptions) -> Result<CommandResult>;

    /// Run the command, failing with [`ShellOutError::CommandFailed`] (or
    /// [`ShellOutError::Timeout`]) unless it succeeded.
    fn run_checked(&self, command: &CommandLine, options: &SpawnOptions) -> Result<CommandResult> {
        let result = self.run(command, options)?;
        result.ensure_success()?;
        Ok(result)
    }
}

/// [`CommandRunner`] backed by `std::process`.
///
/// Blocks the calling thread until the child exits (or is killed after
/// its timeout). Stdin is closed; stdout and stderr are fully drained.
/// The child runs in its own process group (a job object on Windows), so
/// a timeout also kills anything the script started.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandLine, options: &SpawnOptions) -> Result<CommandResult> {
        let rendered = command.to_string();
        let start = Instant::now();

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }

        process_group::configure(&mut cmd);

        debug!(command = %rendered, "spawning process");
        let mut child = cmd.spawn().map_err(|source| ShellOutError::SpawnFailed {
            program: command.program.clone(),
            source,
        })?;
        let tree = ProcessTree::attach(&child);

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = match wait(&mut child, &tree, options.timeout) {
            Ok(status) => status,
            Err(e) => {
                abandon(&mut child, &tree, [stdout, stderr]);
                return Err(e);
            }
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        let duration = start.elapsed();

        let result = match status {
            Some(status) => CommandResult::new(rendered, status.code()).with_duration(duration),
            None => {
                warn!(command = %rendered, pid = tree.pid(), ?duration, "command timed out");
                CommandResult::timeout(rendered, duration)
            }
        };

        debug!(exit_code = ?result.exit_code, ?duration, "process finished");
        Ok(result
            .with_stdout(stdout)
            .with_stderr(stderr)
            .with_timeout(options.timeout)
            .with_valid_exit_codes(options.valid_exit_codes.iter().copied()))
    }
}

/// Wait for the child, killing its whole tree once `timeout` elapses.
///
/// Returns `None` if the tree had to be killed.
fn wait(
    child: &mut Child,
    tree: &ProcessTree,
    timeout: Option<Duration>,
) -> Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait()?));
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        if start.elapsed() >= timeout {
            tree.kill(child)?;
            child.wait()?;
            return Ok(None);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the tree, reap the child and join the readers after a failed wait.
fn abandon(child: &mut Child, tree: &ProcessTree, readers: [Option<Reader>; 2]) {
    if let Err(e) = tree.kill(child) {
        warn!(error = %e, "failed to kill process after wait error");
    }
    if let Err(e) = child.wait() {
        warn!(error = %e, "failed to reap process after wait error");
    }
    for reader in readers {
        let _ = collect(reader);
    }
}

type Reader = JoinHandle<std::io::Result<Vec<u8>>>;

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Reader {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<Reader>) -> Result<String> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| ShellOutError::TaskJoin("output reader panicked".into()))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
