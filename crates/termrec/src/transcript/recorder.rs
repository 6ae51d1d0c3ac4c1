//! Session recording.
//!
//! The recorder runs the user's shell on a fresh PTY, mirrors everything it
//! prints to our own terminal, and appends each chunk to the recording as a
//! timestamped [`Frame`].
//!
//! # Example
//!
//! ```ignore
//! use termrec::{RecordConfig, Recorder};
//!
//! let summary = Recorder::new(RecordConfig::from_env()).record("session.json").await?;
//! println!("{} frames", summary.frames);
//! ```

use std::io::Read;
use std::os::unix::io::{AsFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use termrec_pty::unix::signals::DEFAULT_BACKLOG;
use termrec_pty::unix::{FORWARDED_SIGNALS, open_pair, spawn_child};
use termrec_pty::{ExitStatus, SignalCapture};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::frame::{Frame, FrameWriter};
use crate::config::RecordConfig;
use crate::error::{CodecError, Error, Result};
use crate::relay;
use crate::terminal::{RawModeGuard, sync_size};

type Master = termrec_pty::UnixPtyMaster;

/// Size of the PTY read buffer; one read becomes at most one frame.
const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Size of the terminal input read buffer.
const INPUT_BUFFER_SIZE: usize = 4096;

/// Input chunks buffered between the input thread and the PTY writer.
const INPUT_QUEUE: usize = 16;

/// The terminal a recording is attached to.
///
/// `control` is the terminal put into raw mode and whose size the PTY
/// follows; `input` feeds keystrokes to the shell and `output` receives the
/// mirrored session.
#[derive(Debug)]
pub struct TerminalIo<I, O> {
    /// Controlling terminal.
    pub control: OwnedFd,
    /// Source of user input.
    pub input: I,
    /// Destination for mirrored output.
    pub output: O,
}

impl TerminalIo<std::io::Stdin, tokio::io::Stdout> {
    /// The process's own stdin/stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be duplicated.
    pub fn stdio() -> std::io::Result<Self> {
        let stdin = std::io::stdin();
        let control = stdin.as_fd().try_clone_to_owned()?;
        Ok(Self {
            control,
            input: stdin,
            output: tokio::io::stdout(),
        })
    }
}

/// Outcome of a successful recording.
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    /// Where the recording was written.
    pub path: PathBuf,
    /// Number of frames recorded.
    pub frames: u64,
    /// Number of output bytes recorded.
    pub bytes: u64,
    /// Wall-clock duration of the session.
    pub elapsed: Duration,
    /// How the shell exited.
    pub status: ExitStatus,
}

/// Records shell sessions.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    config: RecordConfig,
}

impl Recorder {
    /// Create a recorder.
    #[must_use]
    pub const fn new(config: RecordConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Record a session on the process's own terminal into `path`.
    ///
    /// # Errors
    ///
    /// See [`Recorder::record_with`].
    pub async fn record(&self, path: impl AsRef<Path>) -> Result<RecordingSummary> {
        self.check_guards(path.as_ref())?;
        let terminal = TerminalIo::stdio().map_err(Error::RawMode)?;
        self.record_with(path, terminal).await
    }

    /// Record a session on `terminal` into `path`.
    ///
    /// Returns once the shell has exited and the recording is flushed.
    ///
    /// # Errors
    ///
    /// Fails before touching anything if called inside a recording or with
    /// an empty path. Afterwards, setup failures (PTY, raw mode, destination,
    /// spawning) are returned as they happen; once the shell has run, a
    /// failed recording write or an unsuccessful exit is returned. The
    /// terminal mode is restored in every case.
    pub async fn record_with<I, O>(
        &self,
        path: impl AsRef<Path>,
        terminal: TerminalIo<I, O>,
    ) -> Result<RecordingSummary>
    where
        I: Read + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let path = path.as_ref();
        self.check_guards(path)?;
        let TerminalIo {
            control,
            input,
            output,
        } = terminal;

        let (master, slave) = open_pair().map_err(Error::Pty)?;
        let mut raw_mode = RawModeGuard::enter(&control).map_err(Error::RawMode)?;

        let file = File::create(path)
            .await
            .map_err(|source| Error::OpenDestination {
                path: path.to_path_buf(),
                source,
            })?;
        let writer = FrameWriter::new(file);

        // Everything the relay needs is acquired before the shell exists, so
        // a setup failure never leaves an unreaped child behind.
        let (mut capture, relay_parts) = if self.config.forward_signals {
            let (capture, signals) = SignalCapture::start(FORWARDED_SIGNALS, DEFAULT_BACKLOG)
                .map_err(Error::SignalSetup)?;
            let resizer = master.resizer().map_err(Error::SignalSetup)?;
            let reference = control
                .try_clone()
                .map_err(|e| Error::SignalSetup(e.into()))?;
            (Some(capture), Some((signals, resizer, reference)))
        } else {
            (None, None)
        };

        let shell = self.config.shell.clone();
        let mut child = spawn_child(
            slave,
            &shell,
            std::iter::empty::<&str>(),
            &self.config.child_config(),
        )
        .await
        .map_err(|source| Error::Spawn {
            shell: shell.to_string_lossy().into_owned(),
            source,
        })?;
        tracing::info!(pid = child.pid(), path = %path.display(), "recording started");
        let started = Instant::now();

        sync_size(&master, control.as_fd());

        let relay = relay_parts.map(|(signals, resizer, reference)| {
            tokio::spawn(relay::run(signals, child.signaller(), resizer, reference))
        });

        let (pty_reader, pty_writer) = tokio::io::split(master);
        let input_task = spawn_input(input, pty_writer);
        let (stop_output, stop_rx) = oneshot::channel();
        let mut output_task = tokio::spawn(copy_output(pty_reader, output, writer, stop_rx));

        let status = child.wait().await;

        if let Some(capture) = capture.as_mut() {
            capture.close();
        }
        if let Some(relay) = relay {
            if let Err(e) = relay.await {
                tracing::warn!(error = %e, "signal relay task failed");
            }
        }

        let outcome = match tokio::time::timeout(self.config.drain_timeout, &mut output_task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::debug!("PTY still open after shell exit, stopping output copy");
                let _ = stop_output.send(());
                output_task.await
            }
        };
        input_task.abort();

        let outcome = outcome.map_err(|e| Error::task("output", e))?;
        let frames = outcome.writer.frames();
        let bytes = outcome.writer.bytes();
        let finished = outcome.writer.finish().await;

        if let Err(e) = raw_mode.restore() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }

        let status = status.map_err(Error::Wait)?;
        if let Some(e) = outcome.error {
            return Err(Error::Record(e));
        }
        finished.map_err(Error::Record)?;

        let elapsed = started.elapsed();
        tracing::info!(
            frames,
            bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            %status,
            "recording finished"
        );

        if !status.success() {
            return Err(Error::ShellFailed { status });
        }

        Ok(RecordingSummary {
            path: path.to_path_buf(),
            frames,
            bytes,
            elapsed,
            status,
        })
    }

    fn check_guards(&self, path: &Path) -> Result<()> {
        if self.config.inside_recording {
            return Err(Error::NestedRecording);
        }
        if path.as_os_str().is_empty() {
            return Err(Error::missing_path("path for recording"));
        }
        Ok(())
    }
}

/// Result of the output copy task.
struct OutputOutcome {
    writer: FrameWriter<File>,
    error: Option<CodecError>,
}

/// Copy PTY output to the terminal and the recording until the PTY closes
/// or `stop` fires.
async fn copy_output<O>(
    mut pty: ReadHalf<Master>,
    mut output: O,
    mut writer: FrameWriter<File>,
    mut stop: oneshot::Receiver<()>,
) -> OutputOutcome
where
    O: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut error = None;
    let mut mirroring = true;

    loop {
        let n = tokio::select! {
            read = pty.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                // EIO once the shell side of the PTY is closed.
                Err(e) => {
                    tracing::debug!(error = %e, "PTY read ended");
                    break;
                }
            },
            _ = &mut stop => break,
        };
        let frame = Frame::now(&buf[..n]);

        if mirroring {
            let mirrored = match output.write_all(&frame.content).await {
                Ok(()) => output.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = mirrored {
                tracing::warn!(error = %e, "terminal output failed, no longer mirroring");
                mirroring = false;
            }
        }

        if error.is_none() {
            if let Err(e) = writer.write_frame(&frame).await {
                tracing::error!(error = %e, "recording write failed, no longer recording");
                error = Some(e);
            }
        }
    }

    OutputOutcome { writer, error }
}

/// Forward terminal input to the PTY.
///
/// Blocking reads happen on a dedicated thread; the returned task writes
/// what it reads to the PTY. The thread is left blocked in `read` when the
/// session ends and exits with the process.
fn spawn_input<I>(input: I, pty: WriteHalf<Master>) -> JoinHandle<()>
where
    I: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Bytes>(INPUT_QUEUE);

    let spawned = std::thread::Builder::new()
        .name("termrec-input".into())
        .spawn(move || read_input(input, &tx));
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to start input thread, input disabled");
    }

    tokio::spawn(write_input(rx, pty))
}

fn read_input<I: Read>(mut input: I, tx: &mpsc::Sender<Bytes>) {
    let mut buf = [0u8; INPUT_BUFFER_SIZE];
    loop {
        match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::debug!(error = %e, "terminal input ended");
                break;
            }
        }
    }
}

async fn write_input(mut rx: mpsc::Receiver<Bytes>, mut pty: WriteHalf<Master>) {
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = pty.write_all(&chunk).await {
            tracing::debug!(error = %e, "PTY write ended");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nested_recording_is_rejected_first() {
        let recorder = Recorder::new(RecordConfig::default().with_inside_recording(true));
        let err = recorder.record("").await.unwrap_err();
        assert!(matches!(err, Error::NestedRecording));
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let recorder = Recorder::default();
        let err = recorder.record("").await.unwrap_err();
        assert!(matches!(err, Error::MissingPath { .. }));
    }

    #[tokio::test]
    async fn input_reaches_pty() {
        let (master, slave) = open_pair().unwrap();
        let (_reader, writer) = tokio::io::split(master);

        let task = spawn_input(std::io::Cursor::new(b"hello\n".to_vec()), writer);
        task.await.unwrap();

        let line = tokio::task::spawn_blocking(move || {
            let mut slave = std::fs::File::from(slave);
            let mut buf = [0u8; 64];
            let n = slave.read(&mut buf).unwrap();
            buf[..n].to_vec()
        })
        .await
        .unwrap();
        assert_eq!(line, b"hello\n");
    }

    #[tokio::test]
    async fn output_is_framed_until_pty_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let writer = FrameWriter::new(File::create(&path).await.unwrap());

        let (master, slave) = open_pair().unwrap();
        let (reader, _writer) = tokio::io::split(master);
        {
            use std::io::Write;
            let mut slave = std::fs::File::from(slave);
            slave.write_all(b"abc").unwrap();
        }

        let (_stop, stop_rx) = oneshot::channel();
        let outcome = copy_output(reader, tokio::io::sink(), writer, stop_rx).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.writer.bytes(), 3);
        outcome.writer.finish().await.unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        assert_eq!(data.lines().count() as u64, 1);
        assert!(data.contains("\"content\":\"YWJj\""));
    }

    #[tokio::test]
    async fn output_copy_stops_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::new(File::create(dir.path().join("out.json")).await.unwrap());

        let (master, _slave) = open_pair().unwrap();
        let (reader, _writer) = tokio::io::split(master);
        let (stop, stop_rx) = oneshot::channel();
        stop.send(()).unwrap();

        let outcome = copy_output(reader, tokio::io::sink(), writer, stop_rx).await;
        assert_eq!(outcome.writer.frames(), 0);
    }
}
