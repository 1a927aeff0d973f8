//! Command line construction and per-call options.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::arch::Architecture;

/// Default PowerShell executable.
pub const POWERSHELL_EXE: &str = "powershell.exe";

/// Flags passed ahead of every script, in order.
pub const POWERSHELL_FLAGS: [&str; 7] = [
    // Hides the copyright banner at startup.
    "-NoLogo",
    // Does not present an interactive prompt to the user.
    "-NonInteractive",
    // Does not load the PowerShell profile.
    "-NoProfile",
    "-ExecutionPolicy",
    "RemoteSigned",
    // PowerShell hangs if stdin is redirected and it expects input.
    "-InputFormat",
    "None",
];

/// A program plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable to spawn.
    pub program: String,
    /// Arguments, each passed to the OS as a single argument.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Create a command line with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Build the PowerShell command line for `script`.
///
/// The script is never parsed or escaped; it always ends up as the single
/// argument following `-Command`.
pub fn build_powershell_command(script: &str) -> CommandLine {
    build_powershell_command_with(POWERSHELL_EXE, script)
}

/// Like [`build_powershell_command`] with a different executable (e.g. `pwsh`).
pub fn build_powershell_command_with(executable: &str, script: &str) -> CommandLine {
    CommandLine::new(executable)
        .args(POWERSHELL_FLAGS)
        .arg("-Command")
        .arg(script)
}

/// Options forwarded verbatim to the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory override (if any).
    pub working_dir: Option<PathBuf>,
    /// Environment variables to set.
    pub env: HashMap<String, String>,
    /// Maximum execution time.
    pub timeout: Option<Duration>,
    /// Exit codes treated as success.
    pub valid_exit_codes: Vec<i32>,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            working_dir: None,
            env: HashMap::new(),
            timeout: None,
            valid_exit_codes: vec![0],
        }
    }
}

impl SpawnOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Set the execution timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Replace the set of exit codes treated as success.
    pub fn valid_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.valid_exit_codes = codes.into_iter().collect();
        self
    }
}

/// Per-call options for the shell-out facade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Architecture override for this call only. Never reaches the runner.
    pub architecture: Option<Architecture>,
    /// Everything else, passed through to the runner.
    pub spawn: SpawnOptions,
}

impl ExecutionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a specific architecture regardless of what the host reports.
    pub fn architecture(mut self, arch: Architecture) -> Self {
        self.architecture = Some(arch);
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spawn = self.spawn.working_dir(dir);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spawn = self.spawn.env(key, value);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.spawn = self.spawn.timeout(duration);
        self
    }

    pub fn valid_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.spawn = self.spawn.valid_exit_codes(codes);
        self
    }

    /// Split off the architecture override from the pass-through options.
    pub fn into_parts(self) -> (Option<Architecture>, SpawnOptions) {
        (self.architecture, self.spawn)
    }
}

impl From<SpawnOptions> for ExecutionOptions {
    fn from(spawn: SpawnOptions) -> Self {
        Self {
            architecture: None,
            spawn,
        }
    }
}
