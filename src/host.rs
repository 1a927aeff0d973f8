//! Host capabilities for the running process.

use tracing::debug;

use crate::arch::{Architecture, ArchitectureProbe};
use crate::redirection::{FsRedirection, RedirectionState};
use crate::Result;

/// Everything the shell-out facade needs from the host.
pub trait Host: ArchitectureProbe + FsRedirection {}

impl<T: ArchitectureProbe + FsRedirection + ?Sized> Host for T {}

/// The host this process is running on.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeHost;

impl NativeHost {
    /// Create a new NativeHost instance.
    pub fn new() -> Self {
        Self
    }

    /// Check if this process is a 32-bit process on 64-bit Windows.
    pub fn is_wow64_process(&self) -> bool {
        #[cfg(windows)]
        {
            win32::is_wow64_process().unwrap_or(false)
        }
        #[cfg(not(windows))]
        {
            false
        }
    }
}

impl ArchitectureProbe for NativeHost {
    fn os_architecture(&self) -> Architecture {
        #[cfg(windows)]
        {
            match Architecture::of_current_build() {
                // A 64-bit process can only run on a 64-bit OS.
                Architecture::X86_64 => Architecture::X86_64,
                _ => match win32::is_wow64_process() {
                    Some(true) => Architecture::X86_64,
                    Some(false) => Architecture::I386,
                    None => Architecture::Unknown,
                },
            }
        }
        // No redirection layer exists outside Windows.
        #[cfg(not(windows))]
        {
            Architecture::Unknown
        }
    }

    fn process_architecture(&self) -> Architecture {
        if cfg!(windows) {
            Architecture::of_current_build()
        } else {
            Architecture::Unknown
        }
    }
}

impl FsRedirection for NativeHost {
    fn disable_redirection(&self) -> Result<RedirectionState> {
        if !self.is_wow64_process() {
            debug!("not a WOW64 process, nothing to disable");
            return Ok(RedirectionState::from_raw(0));
        }

        #[cfg(windows)]
        {
            win32::disable_redirection().map(RedirectionState::from_raw)
        }
        #[cfg(not(windows))]
        {
            unreachable!("WOW64 is only detected on Windows")
        }
    }

    fn restore_redirection(&self, state: RedirectionState) -> Result<()> {
        if !self.is_wow64_process() {
            debug!("not a WOW64 process, nothing to restore");
            return Ok(());
        }

        #[cfg(windows)]
        {
            win32::revert_redirection(state.into_raw())
        }
        #[cfg(not(windows))]
        {
            let _ = state;
            unreachable!("WOW64 is only detected on Windows")
        }
    }
}

#[cfg(windows)]
mod win32 {
    use std::ffi::c_void;

    use windows_sys::Win32::Foundation::BOOL;
    use windows_sys::Win32::Storage::FileSystem::{
        Wow64DisableWow64FsRedirection, Wow64RevertWow64FsRedirection,
    };
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, IsWow64Process};

    use crate::error::ShellOutError;
    use crate::Result;

    pub(super) fn is_wow64_process() -> Option<bool> {
        let mut wow64: BOOL = 0;
        // GetCurrentProcess returns a pseudo handle that needs no closing.
        let ok = unsafe { IsWow64Process(GetCurrentProcess(), &mut wow64) };
        if ok == 0 {
            None
        } else {
            Some(wow64 != 0)
        }
    }

    pub(super) fn disable_redirection() -> Result<usize> {
        let mut old_value: *mut c_void = std::ptr::null_mut();
        let ok = unsafe { Wow64DisableWow64FsRedirection(&mut old_value) };
        if ok == 0 {
            return Err(last_error("Wow64DisableWow64FsRedirection"));
        }
        Ok(old_value as usize)
    }

    pub(super) fn revert_redirection(old_value: usize) -> Result<()> {
        let ok = unsafe { Wow64RevertWow64FsRedirection(old_value as *const c_void) };
        if ok == 0 {
            return Err(last_error("Wow64RevertWow64FsRedirection"));
        }
        Ok(())
    }

    fn last_error(call: &str) -> ShellOutError {
        ShellOutError::RedirectionToggleFailed(format!(
            "{} failed: {}",
            call,
            std::io::Error::last_os_error()
        ))
    }
}
