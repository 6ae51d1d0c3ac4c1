//! Unix child process management for PTY.
//!
//! This module provides child process spawning and management for Unix PTY
//! sessions: the child gets the slave as stdin/stdout/stderr, optionally in a
//! new session with the slave as its controlling terminal.

use std::ffi::OsStr;
use std::io;
use std::os::unix::io::OwnedFd;
use std::process::{ExitStatus as StdExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustix::process::{Pid, Signal, kill_process};
use tokio::process::{Child as TokioChild, Command};

use crate::config::{PtyConfig, WindowSize};
use crate::error::{PtyError, Result, errno_to_io};
use crate::traits::{ExitStatus, SignalTarget};

/// Unix child process handle.
///
/// This struct manages a child process spawned in a PTY, providing methods
/// for waiting on it and sending signals.
pub struct UnixPtyChild {
    /// The underlying tokio child process.
    child: TokioChild,
    /// The process ID.
    pid: u32,
    /// Whether the process is still running. Shared with signallers.
    running: Arc<AtomicBool>,
    /// Cached exit status.
    exit_status: Option<ExitStatus>,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild")
            .field("pid", &self.pid)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl UnixPtyChild {
    fn new(child: TokioChild, pid: u32) -> Self {
        Self {
            child,
            pid,
            running: Arc::new(AtomicBool::new(true)),
            exit_status: None,
        }
    }

    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Check if the process is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait for the child process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status = self.child.wait().await.map_err(PtyError::Wait)?;
        Ok(self.mark_exited(convert_exit_status(status)))
    }

    fn mark_exited(&mut self, status: ExitStatus) -> ExitStatus {
        self.running.store(false, Ordering::SeqCst);
        self.exit_status = Some(status);
        tracing::debug!(pid = self.pid, %status, "child exited");
        status
    }

    /// Send a raw signal to the child process.
    pub fn signal(&self, signal: i32) -> Result<()> {
        self.signaller().send_signal(signal)
    }

    /// Kill the child process (SIGKILL).
    pub fn kill(&self) -> Result<()> {
        self.signal(libc::SIGKILL)
    }

    /// Create a cloneable handle for signalling this child from other tasks.
    #[must_use]
    pub fn signaller(&self) -> ChildSignaller {
        ChildSignaller {
            pid: self.pid,
            running: Arc::clone(&self.running),
        }
    }
}

/// Cloneable handle that delivers signals to a spawned child.
///
/// It observes the child's running flag, so once the owning
/// [`UnixPtyChild`] has reaped the process the handle stops signalling a
/// pid that may have been reused.
#[derive(Debug, Clone)]
pub struct ChildSignaller {
    pid: u32,
    running: Arc<AtomicBool>,
}

impl ChildSignaller {
    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }
}

impl SignalTarget for ChildSignaller {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn send_signal(&self, signal: i32) -> Result<()> {
        if !self.is_running() {
            return Err(PtyError::Signal(io::Error::from_raw_os_error(libc::ESRCH)));
        }

        let pid = Pid::from_raw(self.pid as i32).ok_or_else(|| {
            PtyError::Signal(io::Error::new(io::ErrorKind::InvalidInput, "invalid pid"))
        })?;

        let signal = Signal::from_named_raw(signal).ok_or_else(|| {
            PtyError::Signal(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid signal {signal}"),
            ))
        })?;

        kill_process(pid, signal).map_err(|e| PtyError::Signal(errno_to_io(e)))
    }
}

/// Convert `std::process::ExitStatus` to our `ExitStatus`.
fn convert_exit_status(status: StdExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        ExitStatus::Exited(code)
    } else if let Some(signal) = status.signal() {
        ExitStatus::Signaled(signal)
    } else {
        ExitStatus::Exited(-1)
    }
}

/// Spawn a child process in a PTY.
///
/// This sets up the child's stdin/stdout/stderr to use the slave PTY and
/// executes the specified program. The slave descriptor is consumed; once
/// this returns the parent holds no copy of it, so reads on the master fail
/// with EIO as soon as the child (and anything it forked) closes the slave.
pub async fn spawn_child<S, I>(
    slave_fd: OwnedFd,
    program: S,
    args: I,
    config: &PtyConfig,
) -> Result<UnixPtyChild>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let size = WindowSize::from(config.window_size);
    if let Err(e) = rustix::termios::tcsetwinsize(&slave_fd, size.into()) {
        tracing::warn!(error = %e, "failed to set initial PTY size");
    }

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.env_clear();
    cmd.envs(config.effective_env());

    let stdout = slave_fd.try_clone().map_err(PtyError::Spawn)?;
    let stderr = slave_fd.try_clone().map_err(PtyError::Spawn)?;
    cmd.stdin(Stdio::from(slave_fd));
    cmd.stdout(Stdio::from(stdout));
    cmd.stderr(Stdio::from(stderr));

    if config.new_session {
        let controlling = config.controlling_terminal;
        // SAFETY: setsid and ioctl are async-signal-safe. stdin is already
        // the slave when pre_exec hooks run.
        unsafe {
            cmd.pre_exec(move || {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if controlling && libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;
    let pid = child.id().ok_or_else(|| {
        PtyError::Spawn(io::Error::other("child exited before its pid was read"))
    })?;

    tracing::debug!(pid, program = ?program.as_ref(), "spawned child on PTY");

    Ok(UnixPtyChild::new(child, pid))
}
