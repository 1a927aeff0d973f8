//! # powershell-out
//!
//! Run PowerShell scripts from Rust with WOW64 filesystem redirection
//! handled for the architecture you ask for.
//!
//! A 32-bit process on 64-bit Windows sees `System32` redirected to
//! `SysWOW64`, so `powershell.exe` resolves to the 32-bit engine. When a
//! call targets a different architecture than the one a spawned process
//! would get by default, redirection is disabled for the duration of the
//! spawn and the previous mode is restored afterwards on every path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use powershell_out::{ExecutionOptions, PowershellOut};
//!
//! fn main() -> powershell_out::Result<()> {
//!     powershell_out::logging::try_init().ok();
//!
//!     let ps = PowershellOut::new();
//!     let result = ps.execute("$PSVersionTable.PSVersion", ExecutionOptions::new())?;
//!
//!     println!("exit: {:?}", result.exit_code);
//!     println!("{}", result.stdout_trimmed());
//!
//!     Ok(())
//! }
//! ```

pub mod arch;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod host;
pub mod logging;
pub mod redirection;

// Re-export commonly used types
pub use arch::{Architecture, ArchitectureProbe};
pub use error::{Result, ShellOutError};
pub use execution::{
    build_powershell_command, CommandLine, CommandResult, CommandRunner, ExecutionOptions,
    PowershellOut, ProcessRunner, SpawnOptions,
};
pub use host::{Host, NativeHost};
pub use redirection::{FsRedirection, RedirectionGuard, RedirectionState};
