//! Error types for termrec.
//!
//! [`Error`] covers every way a recording or playback run can fail;
//! [`CodecError`] is the narrower error of the frame codec, wrapped by
//! [`Error::Record`] and [`Error::Decode`] depending on the direction.

use std::path::PathBuf;

use termrec_pty::{ExitStatus, PtyError};
use thiserror::Error;

/// The main error type for termrec operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `record` was invoked from inside a shell that is itself being recorded.
    #[error("cannot start a recording inside a recording")]
    NestedRecording,

    /// No destination (record) or source (play) was given.
    #[error("no {what} specified")]
    MissingPath {
        /// Which argument was missing.
        what: &'static str,
    },

    /// PTY allocation failed.
    #[error("failed to allocate PTY: {0}")]
    Pty(#[source] PtyError),

    /// The controlling terminal could not be put into raw mode.
    #[error("failed to enter raw mode: {0}")]
    RawMode(#[source] std::io::Error),

    /// The recording destination could not be opened for writing.
    #[error("failed to open recording {}: {source}", path.display())]
    OpenDestination {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Signal forwarding could not be set up.
    #[error("failed to set up signal forwarding: {0}")]
    SignalSetup(#[source] PtyError),

    /// The shell could not be started.
    #[error("failed to start shell {shell}: {source}")]
    Spawn {
        /// Shell that was being started.
        shell: String,
        /// The underlying PTY error.
        #[source]
        source: PtyError,
    },

    /// Waiting for the shell failed.
    #[error("failed to wait for shell: {0}")]
    Wait(#[source] PtyError),

    /// The shell exited unsuccessfully.
    #[error("shell {status}")]
    ShellFailed {
        /// Exit status of the shell.
        status: ExitStatus,
    },

    /// Writing a frame to the recording failed.
    #[error("failed to write recording: {0}")]
    Record(#[source] CodecError),

    /// The playback source could not be opened.
    #[error("failed to open recording {}: {source}", path.display())]
    OpenSource {
        /// Local path that was being opened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Fetching a remote recording failed.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        /// URL that was being fetched.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote recording answered with a non-success status.
    #[error("failed to fetch {url}: server responded with {status}")]
    HttpStatus {
        /// URL that was being fetched.
        url: String,
        /// HTTP status code.
        status: reqwest::StatusCode,
    },

    /// The playback source is a URI with a scheme termrec cannot read.
    #[error("unsupported source scheme '{scheme}'")]
    UnsupportedScheme {
        /// The URI scheme.
        scheme: String,
    },

    /// Reading frames from the playback source failed.
    #[error("failed to read recording: {0}")]
    Decode(#[source] CodecError),

    /// Writing replayed output failed.
    #[error("failed to write playback output: {0}")]
    Output(#[source] std::io::Error),

    /// A background task panicked or was cancelled.
    #[error("{task} task failed: {source}")]
    Task {
        /// Name of the task.
        task: &'static str,
        /// Join error reported by the runtime.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Reading from or writing to the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// A complete record could not be parsed.
    #[error("malformed frame on line {line}: {source}")]
    Malformed {
        /// 1-based line number of the record.
        line: u64,
        /// The parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The stream ended in the middle of a record.
    #[error("truncated frame on line {line}")]
    Truncated {
        /// 1-based line number of the record.
        line: u64,
    },
}

/// Result type for termrec operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a missing path error.
    #[must_use]
    pub const fn missing_path(what: &'static str) -> Self {
        Self::MissingPath { what }
    }

    /// Create a task failure error.
    #[must_use]
    pub const fn task(task: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Task { task, source }
    }

    /// Check if this error happened before anything was recorded or played.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::NestedRecording
                | Self::MissingPath { .. }
                | Self::Pty(_)
                | Self::RawMode(_)
                | Self::OpenDestination { .. }
                | Self::SignalSetup(_)
                | Self::OpenSource { .. }
                | Self::Fetch { .. }
                | Self::HttpStatus { .. }
                | Self::UnsupportedScheme { .. }
        )
    }
}

impl CodecError {
    /// Check if the stream ended mid-record.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}
