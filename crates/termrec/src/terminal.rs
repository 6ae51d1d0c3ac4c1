//! Controlling-terminal handling for the recorder.
//!
//! Raw mode is entered through a [`RawModeGuard`], which puts the original
//! termios settings back when restored explicitly or when dropped, so the
//! user's terminal is usable again on every exit path.

use std::io;
use std::os::unix::io::{AsFd, BorrowedFd, OwnedFd};

use rustix::termios::{OptionalActions, Termios, tcgetattr, tcgetwinsize, tcsetattr};
use termrec_pty::{PtyResize, WindowSize};

/// Guard that holds a terminal in raw mode.
pub struct RawModeGuard {
    /// Duplicate of the terminal descriptor.
    fd: OwnedFd,
    /// Settings in effect before raw mode was entered.
    saved: Termios,
    /// Whether the saved settings have been put back.
    restored: bool,
}

impl std::fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawModeGuard")
            .field("fd", &self.fd)
            .field("restored", &self.restored)
            .finish()
    }
}

impl RawModeGuard {
    /// Snapshot the terminal's settings and switch it to raw mode.
    ///
    /// Raw mode disables line buffering, local echo and signal generation,
    /// so every keystroke (including Ctrl-C) reaches the recorded shell.
    ///
    /// # Errors
    ///
    /// Returns an error if `terminal` is not a terminal or its attributes
    /// cannot be changed.
    pub fn enter(terminal: impl AsFd) -> io::Result<Self> {
        let fd = terminal.as_fd().try_clone_to_owned()?;
        let saved = tcgetattr(&fd)?;

        let mut raw = saved.clone();
        raw.make_raw();
        tcsetattr(&fd, OptionalActions::Now, &raw)?;

        tracing::debug!("terminal switched to raw mode");
        Ok(Self {
            fd,
            saved,
            restored: false,
        })
    }

    /// Put the saved settings back. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes cannot be set. The guard is still
    /// considered restored afterwards, so `Drop` does not retry.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        tcsetattr(&self.fd, OptionalActions::Now, &self.saved)?;
        tracing::debug!("terminal mode restored");
        Ok(())
    }

    /// Check whether the saved settings have been put back.
    #[must_use]
    pub const fn is_restored(&self) -> bool {
        self.restored
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// Copy the window size of `reference` onto `target`.
///
/// Failures are logged and otherwise ignored: a PTY with stale geometry is
/// better than an aborted session. Returns the size that was applied.
pub fn sync_size<P>(target: &P, reference: BorrowedFd<'_>) -> Option<WindowSize>
where
    P: PtyResize + ?Sized,
{
    let size = match tcgetwinsize(reference) {
        Ok(ws) => WindowSize::from(ws),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read terminal size");
            return None;
        }
    };

    match target.resize(size) {
        Ok(()) => {
            tracing::debug!(cols = size.cols, rows = size.rows, "synced PTY size");
            Some(size)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to resize PTY");
            None
        }
    }
}
