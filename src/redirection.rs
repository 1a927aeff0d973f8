//! Scoped control of WOW64 filesystem redirection.
//!
//! Disabling redirection hands back an opaque [`RedirectionState`]; restoring
//! replays that exact value rather than blindly re-enabling. The mode is
//! shared by the whole process (per thread on Windows), so overlapping
//! scopes from different threads must be serialized by the caller.

use tracing::{debug, error};

use crate::Result;

/// Redirection mode observed immediately before it was disabled.
///
/// Only meaningful to the [`FsRedirection`] implementation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectionState(usize);

impl RedirectionState {
    /// Wrap a raw value returned by the OS (or a test double).
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw value to hand back on restore.
    pub const fn into_raw(self) -> usize {
        self.0
    }
}

/// Capability to switch filesystem redirection off and back.
pub trait FsRedirection {
    /// Capture the current mode, then disable redirection.
    fn disable_redirection(&self) -> Result<RedirectionState>;

    /// Set the mode back to exactly `state`.
    fn restore_redirection(&self, state: RedirectionState) -> Result<()>;
}

/// Guard that keeps redirection disabled for its lifetime.
///
/// Call [`RedirectionGuard::restore`] to restore and observe errors. A guard
/// dropped without it (early return, panic) restores in `Drop` and logs any
/// failure. Either way the captured state is replayed exactly once.
#[must_use = "redirection is restored as soon as the guard is dropped"]
pub struct RedirectionGuard<'a, T: FsRedirection + ?Sized> {
    toggle: &'a T,
    state: Option<RedirectionState>,
}

impl<'a, T: FsRedirection + ?Sized> RedirectionGuard<'a, T> {
    /// Disable redirection and start the scope.
    ///
    /// If disabling fails no guard is created and nothing will be restored.
    pub fn engage(toggle: &'a T) -> Result<Self> {
        let state = toggle.disable_redirection()?;
        debug!(?state, "filesystem redirection disabled");
        Ok(Self {
            toggle,
            state: Some(state),
        })
    }

    /// State captured when the scope started.
    pub fn captured(&self) -> Option<RedirectionState> {
        self.state
    }

    /// End the scope, restoring the captured state.
    pub fn restore(mut self) -> Result<()> {
        match self.state.take() {
            Some(state) => {
                self.toggle.restore_redirection(state)?;
                debug!(?state, "filesystem redirection restored");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<T: FsRedirection + ?Sized> Drop for RedirectionGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            if let Err(e) = self.toggle.restore_redirection(state) {
                error!(?state, error = %e, "failed to restore filesystem redirection");
            }
        }
    }
}
