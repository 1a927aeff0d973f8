//! Process-tree containment for spawned scripts.
//!
//! A script may start its own children, which inherit the output pipes.
//! Killing only the direct child would leave those pipes open, so the whole
//! tree is placed in one unit that can be killed at once: a process group
//! on Unix, a job object on Windows.

use std::io;
use std::process::{Child, Command};

/// Arrange for the spawned child to lead its own process group.
#[cfg(unix)]
pub(crate) fn configure(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: setpgid is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(set_process_group);
    }
}

#[cfg(not(unix))]
pub(crate) fn configure(_cmd: &mut Command) {}

#[cfg(unix)]
fn set_process_group() -> io::Result<()> {
    let result = unsafe { libc::setpgid(0, 0) };
    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Kill handle for a child and everything it started.
#[derive(Debug)]
pub(crate) struct ProcessTree {
    pid: u32,
    #[cfg(windows)]
    job: Option<win32::Job>,
}

impl ProcessTree {
    /// Track the tree rooted at a freshly spawned `child`.
    ///
    /// On Windows a failure to create or assign the job object is logged
    /// and the tree falls back to killing the direct child only.
    pub(crate) fn attach(child: &Child) -> Self {
        #[cfg(windows)]
        {
            let job = match win32::Job::assign(child) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::warn!(error = %e, "job object unavailable, only the direct child can be killed");
                    None
                }
            };
            Self {
                pid: child.id(),
                job,
            }
        }
        #[cfg(not(windows))]
        {
            Self { pid: child.id() }
        }
    }

    /// Kill every process in the tree, then the direct child.
    ///
    /// Processes that already exited are not an error.
    pub(crate) fn kill(&self, child: &mut Child) -> io::Result<()> {
        #[cfg(unix)]
        kill_process_group(self.pid)?;

        #[cfg(windows)]
        if let Some(job) = &self.job {
            job.terminate()?;
        }

        // The direct child may exit between the last poll and this kill.
        match child.kill() {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }

    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }
}

/// Send SIGKILL to the process group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) -> io::Result<()> {
    // The child called setpgid(0, 0), so its pid is the group id.
    let result = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(windows)]
mod win32 {
    use std::ffi::c_void;
    use std::io;
    use std::os::windows::io::AsRawHandle;
    use std::process::Child;

    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::System::JobObjects::{
        AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
        SetInformationJobObject, TerminateJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
        JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
    };

    /// Owned job object handle; closing it kills any process still inside.
    #[derive(Debug)]
    pub(super) struct Job(HANDLE);

    // SAFETY: a job handle may be used and closed from any thread.
    unsafe impl Send for Job {}
    unsafe impl Sync for Job {}

    impl Job {
        pub(super) fn assign(child: &Child) -> io::Result<Self> {
            let job = Self::create()?;
            let process = child.as_raw_handle() as HANDLE;
            if unsafe { AssignProcessToJobObject(job.0, process) } == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(job)
        }

        fn create() -> io::Result<Self> {
            let handle = unsafe { CreateJobObjectW(std::ptr::null(), std::ptr::null()) };
            if handle == 0 {
                return Err(io::Error::last_os_error());
            }
            let job = Self(handle);

            let mut limits: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = unsafe { std::mem::zeroed() };
            limits.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
            let ok = unsafe {
                SetInformationJobObject(
                    job.0,
                    JobObjectExtendedLimitInformation,
                    &mut limits as *mut _ as *mut c_void,
                    std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                )
            };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(job)
        }

        pub(super) fn terminate(&self) -> io::Result<()> {
            if unsafe { TerminateJobObject(self.0, 1) } == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl Drop for Job {
        fn drop(&mut self) {
            unsafe {
                CloseHandle(self.0);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[test]
    fn test_child_leads_its_own_group() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5").stdin(Stdio::null());
        configure(&mut cmd);
        let mut child = cmd.spawn().unwrap();

        let tree = ProcessTree::attach(&child);
        let pgid = unsafe { libc::getpgid(tree.pid() as libc::pid_t) };
        assert_eq!(pgid, child.id() as libc::pid_t);

        tree.kill(&mut child).unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_kill_after_exit_is_not_an_error() {
        let mut cmd = Command::new("true");
        configure(&mut cmd);
        let mut child = cmd.spawn().unwrap();
        child.wait().unwrap();

        let tree = ProcessTree::attach(&child);
        assert!(tree.kill(&mut child).is_ok());
    }
}
