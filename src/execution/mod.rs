//! PowerShell command execution.
//!
//! This module provides:
//! - Command line construction with fixed safety flags
//! - Blocking subprocess execution with optional timeout
//! - The [`PowershellOut`] facade that handles WOW64 redirection
//!
//! # Example
//!
//! ```no_run
//! use powershell_out::arch::Architecture;
//! use powershell_out::execution::{ExecutionOptions, PowershellOut};
//!
//! let ps = PowershellOut::new();
//! let result = ps
//!     .execute_checked(
//!         "Get-ChildItem C:\\Windows\\System32\\drivers",
//!         ExecutionOptions::new().architecture(Architecture::X86_64),
//!     )
//!     .unwrap();
//! println!("{}", result.stdout);
//! ```

mod command;
mod powershell;
mod process_group;
mod result;
mod runner;

pub use command::{
    build_powershell_command, build_powershell_command_with, CommandLine, ExecutionOptions,
    SpawnOptions, POWERSHELL_EXE, POWERSHELL_FLAGS,
};
pub use powershell::PowershellOut;
pub use result::CommandResult;
pub use runner::{CommandRunner, ProcessRunner};
