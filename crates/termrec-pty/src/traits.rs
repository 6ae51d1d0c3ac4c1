//! Core traits for PTY abstraction.
//!
//! This module defines the seams the recorder's background tasks talk to:
//!
//! - [`PtyResize`]: something whose window geometry can be changed.
//! - [`SignalTarget`]: a process that forwarded signals are delivered to.
//!
//! Both are implemented by the Unix handles in [`crate::unix`] and can be
//! mocked in tests.

use crate::config::WindowSize;
use crate::error::Result;

/// A pseudo-terminal whose window size can be read and changed.
///
/// Resizing only touches terminal geometry (an ioctl), never the byte
/// stream, so implementations may be used alongside concurrent readers and
/// writers of the same PTY.
pub trait PtyResize: Send + Sync {
    /// Resize the PTY to the given window size.
    ///
    /// The kernel delivers SIGWINCH to the PTY's foreground process group.
    fn resize(&self, size: WindowSize) -> Result<()>;

    /// Get the current window size.
    fn window_size(&self) -> Result<WindowSize>;
}

/// A child process that signals can be forwarded to.
pub trait SignalTarget: Send + Sync {
    /// Check if the process is still running.
    fn is_running(&self) -> bool;

    /// Deliver a raw signal number to the process.
    fn send_signal(&self, signal: i32) -> Result<()>;
}

/// Exit status of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process exited normally with the given exit code.
    Exited(i32),

    /// The process was terminated by a signal.
    Signaled(i32),
}

impl ExitStatus {
    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Get the exit code, if available.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(_) => None,
        }
    }

    /// Get the signal number that terminated the process.
    #[must_use]
    pub const fn signal(&self) -> Option<i32> {
        match self {
            Self::Signaled(sig) => Some(*sig),
            Self::Exited(_) => None,
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}
