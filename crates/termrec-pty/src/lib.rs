//! termrec-pty: async Unix pseudo-terminal primitives
//!
//! This crate provides the operating-system facilities `termrec` builds its
//! recorder on: allocating a PTY master/slave pair, spawning a child process
//! attached to the slave in its own session, resizing the PTY, and capturing
//! process signals into a bounded channel.
//!
//! # Platform Support
//!
//! - **Unix** (Linux, macOS, BSD): uses `rustix` for PTY allocation and
//!   termios calls, `tokio`'s `AsyncFd` for non-blocking master I/O and
//!   `signal-hook` for signal capture.
//!
//! # Quick Start
//!
//! ```ignore
//! use termrec_pty::unix::{open_pair, spawn_child};
//! use termrec_pty::PtyConfig;
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (mut master, slave) = open_pair()?;
//!     let mut child = spawn_child(slave, "echo", ["hello"], &PtyConfig::default()).await?;
//!
//!     let mut buf = [0u8; 1024];
//!     let n = master.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     child.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod unix;

// Re-export primary types
pub use config::{PtyConfig, PtyConfigBuilder, WindowSize};
pub use error::{PtyError, Result};
pub use traits::{ExitStatus, PtyResize, SignalTarget};

#[cfg(unix)]
pub use unix::{
    ChildSignaller, PtyResizer, SignalCapture, UnixPtyChild, UnixPtyMaster, open_pair,
    spawn_child,
};
