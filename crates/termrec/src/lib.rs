//! termrec: record terminal sessions and replay them at the recorded pace
//!
//! `termrec` runs an interactive shell on a pseudo-terminal, mirrors its
//! output to your terminal and writes every chunk of output, with the time it
//! was produced, to a recording. Recordings can later be played back, from a
//! local file or over HTTP, with the original pauses between chunks.
//!
//! # Features
//!
//! - **Byte-exact capture**: control sequences and binary output survive
//!   unchanged (base64 frames in newline-delimited JSON)
//! - **Faithful pacing**: playback reproduces the gaps between frames
//! - **Signal forwarding**: terminal resizes and signals reach the shell
//! - **Nested-session guard**: recording inside a recording is refused
//! - **Streaming playback**: recordings are decoded as they are read
//!
//! # Example
//!
//! ```ignore
//! use termrec::{PlaybackConfig, RecordConfig, Recorder};
//!
//! #[tokio::main]
//! async fn main() -> termrec::Result<()> {
//!     Recorder::new(RecordConfig::from_env()).record("demo.json").await?;
//!     termrec::play("demo.json", PlaybackConfig::from_env()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
#[cfg(unix)]
pub mod relay;
pub mod telemetry;
#[cfg(unix)]
pub mod terminal;
pub mod transcript;

pub use config::{EnvConfig, PlaybackConfig, RecordConfig};
pub use error::{CodecError, Error, Result};
#[cfg(unix)]
pub use terminal::{RawModeGuard, sync_size};
pub use transcript::{Frame, FrameReader, FrameWriter, PlaybackSummary, Player, Source, play};
#[cfg(unix)]
pub use transcript::{Recorder, RecordingSummary, TerminalIo};
