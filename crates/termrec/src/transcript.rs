//! Session recordings.
//!
//! This module provides the recording format ([`frame`]), the recorder that
//! captures a shell session into it, and the player that replays it at the
//! recorded pace from a local file or a URL.

pub mod frame;
pub mod player;
#[cfg(unix)]
pub mod recorder;
pub mod source;

pub use frame::{Frame, FrameReader, FrameWriter};
pub use player::{PacingCursor, PlaybackSummary, Player, play};
#[cfg(unix)]
pub use recorder::{Recorder, RecordingSummary, TerminalIo};
pub use source::{Source, SourceReader};
