//! Unix platform implementation for PTY operations.
//!
//! This module provides the Unix-specific PTY implementation, including:
//!
//! - PTY master/slave pair allocation via openpt/grantpt/unlockpt
//! - Async I/O through tokio's `AsyncFd`
//! - Child process management with session/controlling terminal setup
//! - Signal capture into a bounded channel
//!
//! # Example
//!
//! ```ignore
//! use termrec_pty::unix::{open_pair, spawn_child};
//! use termrec_pty::PtyConfig;
//!
//! let (master, slave) = open_pair()?;
//! let child = spawn_child(slave, "/bin/bash", std::iter::empty::<&str>(), &PtyConfig::default()).await?;
//! ```

mod child;
mod pty;
pub mod signals;

use std::os::unix::io::OwnedFd;

pub use child::{ChildSignaller, UnixPtyChild, spawn_child};
pub use pty::{PtyResizer, UnixPtyMaster, open_slave};
pub use signals::{FORWARDED_SIGNALS, SignalCapture, is_sigwinch, signal_name, sigwinch};

use crate::error::Result;

/// Allocate a PTY pair.
///
/// Returns the async master and the opened slave descriptor, ready to be
/// handed to [`spawn_child`].
///
/// # Errors
///
/// Returns an error if PTY allocation or opening the slave fails.
pub fn open_pair() -> Result<(UnixPtyMaster, OwnedFd)> {
    let (master, slave_path) = UnixPtyMaster::open()?;
    let slave = open_slave(&slave_path)?;
    Ok((master, slave))
}
