//! Paced playback of recordings.
//!
//! Playback is a two-stage pipeline joined by a bounded channel. The decode
//! stage reads frames and works out how long to wait before each one; the
//! writer stage sleeps for that long and writes the frame's bytes. Decoding
//! therefore runs ahead of the output by at most the channel's capacity.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::frame::{Frame, FrameReader};
use super::source::Source;
use crate::config::PlaybackConfig;
use crate::error::{CodecError, Error, Result};

/// Tracks the previous frame's timestamp to derive inter-frame delays.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacingCursor {
    previous: Option<DateTime<Utc>>,
}

impl PacingCursor {
    /// Create a cursor positioned before the first frame.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Delay to wait before emitting `frame`, then advance past it.
    ///
    /// The first frame plays immediately.
    pub fn advance(&mut self, frame: &Frame) -> Duration {
        let delay = self
            .previous
            .map_or(Duration::ZERO, |previous| frame.delay_since(previous));
        self.previous = Some(frame.timestamp);
        delay
    }
}

/// Outcome of a completed playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Frames written to the output.
    pub frames: u64,
    /// Bytes written to the output.
    pub bytes: u64,
    /// Sum of the delays that were waited out.
    pub paced: Duration,
}

/// Replays recordings onto an output stream.
#[derive(Debug)]
pub struct Player<W> {
    output: W,
    config: PlaybackConfig,
}

impl<W> Player<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a player writing to `output`.
    pub const fn new(output: W, config: PlaybackConfig) -> Self {
        Self { output, config }
    }

    /// Play every frame from `source` at its recorded pace.
    ///
    /// Returns once both pipeline stages have finished. Frames decoded before
    /// a decode error are still played before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if writing fails (which also stops decoding)
    /// and [`Error::Decode`] if the source holds a bad or truncated record.
    pub async fn play<R>(self, source: R) -> Result<PlaybackSummary>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));

        let decoder = tokio::spawn(decode(FrameReader::new(source), tx));
        let writer = tokio::spawn(emit(rx, self.output));

        let (decoded, written) = tokio::join!(decoder, writer);
        let decoded = decoded.map_err(|e| Error::task("decode", e))?;
        let summary = written.map_err(|e| Error::task("playback", e))??;
        decoded.map_err(Error::Decode)?;

        tracing::debug!(
            frames = summary.frames,
            bytes = summary.bytes,
            paced_ms = summary.paced.as_millis() as u64,
            "playback finished"
        );
        Ok(summary)
    }
}

/// Play the recording at `source` (a path or URL) onto stdout.
///
/// # Errors
///
/// Returns source resolution and opening errors, and anything
/// [`Player::play`] returns.
pub async fn play(source: &str, config: PlaybackConfig) -> Result<PlaybackSummary> {
    let source = Source::parse(source)?;
    let reader = source.open().await?;
    tracing::info!(%source, "playback started");
    Player::new(tokio::io::stdout(), config).play(reader).await
}

/// Decode stage: read frames and queue them with their delays.
///
/// Stops early without error when the writer stage has gone away.
async fn decode<R>(
    mut reader: FrameReader<R>,
    tx: mpsc::Sender<(Duration, Bytes)>,
) -> std::result::Result<u64, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut cursor = PacingCursor::new();
    let mut decoded = 0;

    while let Some(frame) = reader.next_frame().await? {
        let delay = cursor.advance(&frame);
        if tx.send((delay, Bytes::from(frame.content))).await.is_err() {
            tracing::debug!("playback output closed, stopping decode");
            break;
        }
        decoded += 1;
    }

    Ok(decoded)
}

/// Writer stage: wait out each delay, then write the content.
async fn emit<W>(mut rx: mpsc::Receiver<(Duration, Bytes)>, mut output: W) -> Result<PlaybackSummary>
where
    W: AsyncWrite + Unpin,
{
    let mut summary = PlaybackSummary::default();

    while let Some((delay, content)) = rx.recv().await {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
            summary.paced += delay;
        }
        output.write_all(&content).await.map_err(Error::Output)?;
        output.flush().await.map_err(Error::Output)?;
        summary.frames += 1;
        summary.bytes += content.len() as u64;
    }

    Ok(summary)
}
