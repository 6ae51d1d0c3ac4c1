//! Signal relay between the recorder process and the recorded shell.
//!
//! Signals captured by [`termrec_pty::SignalCapture`] arrive on a channel.
//! SIGWINCH means our own terminal changed size, so the new geometry is
//! copied onto the PTY (the kernel then signals the shell itself). Every
//! other signal is forwarded verbatim to the shell.

use std::os::unix::io::AsFd;

use termrec_pty::unix::{is_sigwinch, signal_name};
use termrec_pty::{PtyError, PtyResize, SignalTarget};
use tokio::sync::mpsc;

use crate::terminal::sync_size;

/// What the relay did over its lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Signals delivered to the child.
    pub forwarded: u64,
    /// Window-size changes applied to the PTY.
    pub resized: u64,
}

/// Consume signals until the channel closes.
///
/// `reference` is the terminal whose size the PTY mirrors. Signals for a
/// child that has already exited are dropped silently.
pub async fn run<C, P, R>(
    mut signals: mpsc::Receiver<i32>,
    child: C,
    pty: P,
    reference: R,
) -> RelayStats
where
    C: SignalTarget,
    P: PtyResize,
    R: AsFd,
{
    let mut stats = RelayStats::default();

    while let Some(signal) = signals.recv().await {
        if is_sigwinch(signal) {
            if sync_size(&pty, reference.as_fd()).is_some() {
                stats.resized += 1;
            }
            continue;
        }

        if forward(&child, signal) {
            stats.forwarded += 1;
        }
    }

    tracing::debug!(
        forwarded = stats.forwarded,
        resized = stats.resized,
        "signal relay finished"
    );
    stats
}

fn forward<C: SignalTarget + ?Sized>(child: &C, signal: i32) -> bool {
    let name = signal_name(signal);
    if !child.is_running() {
        tracing::debug!(signal = name, "child gone, not forwarding");
        return false;
    }

    match child.send_signal(signal) {
        Ok(()) => {
            tracing::debug!(signal = name, "forwarded signal");
            true
        }
        Err(PtyError::Signal(e)) if e.raw_os_error() == Some(libc::ESRCH) => {
            tracing::debug!(signal = name, "child exited before signal delivery");
            false
        }
        Err(e) => {
            tracing::warn!(signal = name, error = %e, "failed to forward signal");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use termrec_pty::WindowSize;
    use termrec_pty::unix::{open_pair, sigwinch};

    #[derive(Default)]
    struct MockChild {
        exited: AtomicBool,
        vanish: bool,
        received: Mutex<Vec<i32>>,
    }

    impl SignalTarget for &MockChild {
        fn is_running(&self) -> bool {
            !self.exited.load(Ordering::SeqCst)
        }

        fn send_signal(&self, signal: i32) -> termrec_pty::Result<()> {
            if self.vanish {
                return Err(PtyError::Signal(io::Error::from_raw_os_error(libc::ESRCH)));
            }
            self.received.lock().unwrap().push(signal);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockPty {
        sizes: Mutex<Vec<WindowSize>>,
    }

    impl PtyResize for &MockPty {
        fn resize(&self, size: WindowSize) -> termrec_pty::Result<()> {
            self.sizes.lock().unwrap().push(size);
            Ok(())
        }

        fn window_size(&self) -> termrec_pty::Result<WindowSize> {
            Ok(self.sizes.lock().unwrap().last().copied().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn forwards_and_resizes() {
        let (reference, _slave) = open_pair().unwrap();
        reference.set_window_size(WindowSize::new(100, 30)).unwrap();
        let child = MockChild::default();
        let pty = MockPty::default();

        let (tx, rx) = mpsc::channel(8);
        tx.send(libc::SIGINT).await.unwrap();
        tx.send(sigwinch()).await.unwrap();
        tx.send(libc::SIGTERM).await.unwrap();
        drop(tx);

        let stats = run(rx, &child, &pty, &reference).await;
        assert_eq!(stats, RelayStats { forwarded: 2, resized: 1 });
        assert_eq!(*child.received.lock().unwrap(), vec![libc::SIGINT, libc::SIGTERM]);
        assert_eq!(*pty.sizes.lock().unwrap(), vec![WindowSize::new(100, 30)]);
    }

    #[tokio::test]
    async fn exited_child_is_skipped() {
        let (reference, _slave) = open_pair().unwrap();
        let child = MockChild::default();
        child.exited.store(true, Ordering::SeqCst);
        let pty = MockPty::default();

        let (tx, rx) = mpsc::channel(8);
        tx.send(libc::SIGHUP).await.unwrap();
        drop(tx);

        let stats = run(rx, &child, &pty, &reference).await;
        assert_eq!(stats.forwarded, 0);
        assert!(child.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn vanished_child_is_not_an_error() {
        let (reference, _slave) = open_pair().unwrap();
        let child = MockChild {
            vanish: true,
            ..MockChild::default()
        };
        let pty = MockPty::default();

        let (tx, rx) = mpsc::channel(8);
        tx.send(libc::SIGUSR1).await.unwrap();
        drop(tx);

        assert_eq!(run(rx, &child, &pty, &reference).await.forwarded, 0);
    }

    #[tokio::test]
    async fn ends_when_channel_closes() {
        let (reference, _slave) = open_pair().unwrap();
        let child = MockChild::default();
        let pty = MockPty::default();
        let (tx, rx) = mpsc::channel::<i32>(1);
        drop(tx);
        assert_eq!(run(rx, &child, &pty, &reference).await, RelayStats::default());
    }
}
