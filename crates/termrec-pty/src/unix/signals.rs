//! Signal capture for PTY sessions.
//!
//! Signals delivered to this process are captured on a dedicated thread and
//! pushed into a bounded channel, so a single async consumer can decide what
//! to do with each one (resize the PTY on SIGWINCH, forward the rest to the
//! child).

use std::io;
use std::thread::JoinHandle;

use signal_hook::consts::FORBIDDEN;
use signal_hook::consts::signal::{
    SIGALRM, SIGCONT, SIGHUP, SIGINT, SIGIO, SIGPROF, SIGQUIT, SIGTERM, SIGTSTP, SIGTTIN, SIGTTOU,
    SIGURG, SIGUSR1, SIGUSR2, SIGVTALRM, SIGWINCH, SIGXCPU, SIGXFSZ,
};
use signal_hook::iterator::{Handle, Signals};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{PtyError, Result};

/// Every signal a recording session relays to its shell.
///
/// This is all catchable signals except SIGCHLD (the runtime reaps children
/// itself), SIGPIPE (ignored by the Rust runtime) and the synchronous fault
/// signals SIGABRT, SIGBUS, SIGSYS and SIGTRAP, which must keep their default
/// action in this process.
pub const FORWARDED_SIGNALS: &[i32] = &[
    SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2, SIGALRM, SIGVTALRM, SIGPROF, SIGTSTP,
    SIGTTIN, SIGTTOU, SIGCONT, SIGURG, SIGXCPU, SIGXFSZ, SIGIO, SIGWINCH,
];

/// Default number of captured signals buffered before new ones are dropped.
pub const DEFAULT_BACKLOG: usize = 32;

/// Handle to a running signal capture thread.
///
/// Dropping the handle (or calling [`SignalCapture::close`]) unregisters the
/// iterator, stops the thread and thereby closes the channel.
#[derive(Debug)]
pub struct SignalCapture {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalCapture {
    /// Start capturing `signals` into a channel holding at most `backlog`
    /// undelivered signals.
    ///
    /// Registration happens before this returns, so signals raised between
    /// now and the first `recv` on the receiver are queued.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal cannot be registered (for example
    /// SIGKILL) or the capture thread cannot be spawned.
    pub fn start(signals: &[i32], backlog: usize) -> Result<(Self, mpsc::Receiver<i32>)> {
        if let Some(&signal) = signals.iter().find(|s| FORBIDDEN.contains(s)) {
            return Err(PtyError::SignalRegistration(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("signal {signal} cannot be caught"),
            )));
        }

        let mut iterator = Signals::new(signals).map_err(PtyError::SignalRegistration)?;
        let handle = iterator.handle();
        let (tx, rx) = mpsc::channel(backlog.max(1));

        let thread = std::thread::Builder::new()
            .name("termrec-signals".into())
            .spawn(move || {
                for signal in iterator.forever() {
                    match tx.try_send(signal) {
                        Ok(()) => {}
                        Err(TrySendError::Full(signal)) => {
                            tracing::warn!(signal = signal_name(signal), "signal backlog full, dropping");
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
            })
            .map_err(PtyError::SignalRegistration)?;

        Ok((
            Self {
                handle,
                thread: Some(thread),
            },
            rx,
        ))
    }

    /// Stop capturing. Idempotent.
    pub fn close(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// Check whether the capture has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl Drop for SignalCapture {
    fn drop(&mut self) {
        self.close();
    }
}

/// Check if a signal number is SIGWINCH.
#[must_use]
pub const fn is_sigwinch(signal: i32) -> bool {
    signal == SIGWINCH
}

/// Get the signal number for SIGWINCH.
#[must_use]
pub const fn sigwinch() -> i32 {
    SIGWINCH
}

/// Human readable name of a signal, for logs.
#[must_use]
pub const fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGHUP => "SIGHUP",
        SIGINT => "SIGINT",
        SIGQUIT => "SIGQUIT",
        SIGTERM => "SIGTERM",
        SIGUSR1 => "SIGUSR1",
        SIGUSR2 => "SIGUSR2",
        SIGALRM => "SIGALRM",
        SIGVTALRM => "SIGVTALRM",
        SIGPROF => "SIGPROF",
        SIGTSTP => "SIGTSTP",
        SIGTTIN => "SIGTTIN",
        SIGTTOU => "SIGTTOU",
        SIGCONT => "SIGCONT",
        SIGURG => "SIGURG",
        SIGXCPU => "SIGXCPU",
        SIGXFSZ => "SIGXFSZ",
        SIGIO => "SIGIO",
        SIGWINCH => "SIGWINCH",
        _ => "unknown",
    }
}
