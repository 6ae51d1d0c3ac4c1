//! Unix PTY allocation and management.
//!
//! This module provides the core PTY master implementation for Unix systems,
//! using rustix for low-level PTY operations.

use std::io;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use rustix::fs::{OFlags, fcntl_setfl};
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{tcgetwinsize, tcsetwinsize};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::config::WindowSize;
use crate::error::{PtyError, Result, errno_to_io};
use crate::traits::PtyResize;

/// Unix PTY master implementation.
///
/// This struct wraps the master side of a Unix pseudo-terminal, providing
/// async read/write operations and terminal control.
pub struct UnixPtyMaster {
    /// The master file descriptor wrapped for async I/O.
    async_fd: AsyncFd<OwnedFd>,
    /// Whether the PTY is still open.
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for UnixPtyMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyMaster")
            .field("fd", &self.async_fd.as_raw_fd())
            .field("open", &self.open.load(Ordering::SeqCst))
            .finish()
    }
}

impl UnixPtyMaster {
    /// Open a new PTY master.
    ///
    /// This allocates a new pseudo-terminal pair and returns the master side
    /// together with the path of the slave device.
    ///
    /// # Errors
    ///
    /// Returns an error if PTY allocation fails.
    pub fn open() -> Result<(Self, String)> {
        let create = |e: rustix::io::Errno| PtyError::Create(errno_to_io(e));

        let master_fd = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).map_err(create)?;
        grantpt(&master_fd).map_err(create)?;
        unlockpt(&master_fd).map_err(create)?;

        let slave_name = ptsname(&master_fd, Vec::new()).map_err(create)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| {
                PtyError::Create(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid slave path encoding",
                ))
            })?
            .to_string();

        // The master must not block the runtime; readiness comes from AsyncFd.
        fcntl_setfl(&master_fd, OFlags::NONBLOCK).map_err(create)?;

        let async_fd = AsyncFd::new(master_fd).map_err(PtyError::Create)?;

        tracing::debug!(slave = %slave_path, "allocated PTY pair");

        Ok((
            Self {
                async_fd,
                open: Arc::new(AtomicBool::new(true)),
            },
            slave_path,
        ))
    }

    /// Get the slave PTY path.
    pub fn slave_name(&self) -> Result<String> {
        let name = ptsname(self.async_fd.get_ref(), Vec::new())
            .map_err(|e| PtyError::Io(errno_to_io(e)))?;
        name.to_str()
            .map(std::string::ToString::to_string)
            .map_err(|_| {
                PtyError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid slave path encoding",
                ))
            })
    }

    /// Check if the PTY is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Set the window size.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        if !self.is_open() {
            return Err(PtyError::Closed);
        }
        tcsetwinsize(self.async_fd.get_ref(), size.into())
            .map_err(|e| PtyError::Resize(errno_to_io(e)))
    }

    /// Get the current window size.
    pub fn get_window_size(&self) -> Result<WindowSize> {
        if !self.is_open() {
            return Err(PtyError::Closed);
        }
        tcgetwinsize(self.async_fd.get_ref())
            .map(WindowSize::from)
            .map_err(|e| PtyError::GetAttributes(errno_to_io(e)))
    }

    /// Create an independent handle that can only resize this PTY.
    ///
    /// The handle owns a duplicate of the master descriptor, so it stays
    /// usable after the master has been split into read and write halves.
    pub fn resizer(&self) -> Result<PtyResizer> {
        let fd = self.async_fd.get_ref().try_clone().map_err(PtyError::Io)?;
        Ok(PtyResizer { fd })
    }

    /// Close the PTY master.
    ///
    /// Subsequent reads return EOF and writes fail with `BrokenPipe`.
    pub fn close(&mut self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl AsRawFd for UnixPtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.async_fd.as_raw_fd()
    }
}

impl AsFd for UnixPtyMaster {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.async_fd.get_ref().as_fd()
    }
}

impl AsyncRead for UnixPtyMaster {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.open.load(Ordering::SeqCst) {
            return Poll::Ready(Ok(())); // EOF
        }

        loop {
            let mut guard = match self.async_fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            let unfilled = buf.initialize_unfilled();
            match rustix::io::read(self.async_fd.get_ref(), unfilled) {
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(rustix::io::Errno::AGAIN) => {
                    guard.clear_ready();
                }
                Err(e) => return Poll::Ready(Err(errno_to_io(e))),
            }
        }
    }
}

impl AsyncWrite for UnixPtyMaster {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if !self.open.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "PTY closed")));
        }

        loop {
            let mut guard = match self.async_fd.poll_write_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            match rustix::io::write(self.async_fd.get_ref(), buf) {
                Ok(n) => return Poll::Ready(Ok(n)),
                Err(rustix::io::Errno::AGAIN) => {
                    guard.clear_ready();
                }
                Err(e) => return Poll::Ready(Err(errno_to_io(e))),
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.open.store(false, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

impl PtyResize for UnixPtyMaster {
    fn resize(&self, size: WindowSize) -> Result<()> {
        self.set_window_size(size)
    }

    fn window_size(&self) -> Result<WindowSize> {
        self.get_window_size()
    }
}

/// Resize-only handle to a PTY master.
///
/// Obtained from [`UnixPtyMaster::resizer`].
#[derive(Debug)]
pub struct PtyResizer {
    fd: OwnedFd,
}

impl AsFd for PtyResizer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl PtyResize for PtyResizer {
    fn resize(&self, size: WindowSize) -> Result<()> {
        tcsetwinsize(&self.fd, size.into()).map_err(|e| PtyError::Resize(errno_to_io(e)))
    }

    fn window_size(&self) -> Result<WindowSize> {
        tcgetwinsize(&self.fd)
            .map(WindowSize::from)
            .map_err(|e| PtyError::GetAttributes(errno_to_io(e)))
    }
}

/// Open the slave side of a PTY.
///
/// The slave is opened with `O_NOCTTY`; the child acquires it as its
/// controlling terminal itself (see [`crate::unix::spawn_child`]).
pub fn open_slave(path: &str) -> Result<OwnedFd> {
    use rustix::fs::{Mode, open};
    use std::path::Path;

    open(
        Path::new(path),
        OFlags::RDWR | OFlags::NOCTTY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| PtyError::Create(errno_to_io(e)))
}
