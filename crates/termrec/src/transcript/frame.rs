//! Recording format: timestamped output frames.
//!
//! A recording is newline-delimited JSON, one frame per line:
//!
//! ```text
//! {"timestamp":"2015-06-01T10:00:00.123456789Z","content":"aGVsbG8NCg=="}
//! ```
//!
//! `timestamp` is RFC 3339 (any UTC offset is accepted when reading) and
//! `content` is the standard base64 encoding of the raw bytes, so control
//! sequences and binary data survive unchanged. Lines are self-delimiting,
//! so a recording can be decoded as a stream without loading it whole.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CodecError;

/// One chunk of terminal output and the moment it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Wall-clock time the chunk was read from the PTY.
    pub timestamp: DateTime<Utc>,
    /// Raw bytes exactly as the child wrote them.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

impl Frame {
    /// Create a frame.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            content: content.into(),
        }
    }

    /// Create a frame stamped with the current time.
    #[must_use]
    pub fn now(content: impl Into<Vec<u8>>) -> Self {
        Self::new(Utc::now(), content)
    }

    /// Time elapsed between `earlier` and this frame.
    ///
    /// Wall clocks can step backwards; such gaps count as zero.
    #[must_use]
    pub fn delay_since(&self, earlier: DateTime<Utc>) -> Duration {
        (self.timestamp - earlier).to_std().unwrap_or(Duration::ZERO)
    }

    /// Serialize the frame as one newline-terminated record.
    pub fn to_line(&self) -> Result<Vec<u8>, CodecError> {
        let mut line = serde_json::to_vec(self).map_err(CodecError::Encode)?;
        line.push(b'\n');
        Ok(line)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    // Recordings made by older tools store an empty chunk as `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

/// Writes frames to a recording sink.
#[derive(Debug)]
pub struct FrameWriter<W> {
    sink: W,
    frames: u64,
    bytes: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap a sink.
    pub const fn new(sink: W) -> Self {
        Self {
            sink,
            frames: 0,
            bytes: 0,
        }
    }

    /// Append one frame.
    ///
    /// Each frame is written with a single `write_all`, so a reader never
    /// sees two records interleaved.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), CodecError> {
        let line = frame.to_line()?;
        self.sink.write_all(&line).await?;
        self.frames += 1;
        self.bytes += frame.content.len() as u64;
        Ok(())
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of content bytes written so far.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Flush the sink and hand it back.
    pub async fn finish(mut self) -> Result<W, CodecError> {
        self.sink.flush().await?;
        Ok(self.sink)
    }
}

/// Reads frames from a recording source, one record at a time.
#[derive(Debug)]
pub struct FrameReader<R> {
    source: R,
    line: u64,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    /// Wrap a buffered source.
    pub const fn new(source: R) -> Self {
        Self {
            source,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` at a clean end of stream. A record cut off by the
    /// end of the stream is reported as [`CodecError::Truncated`]; any other
    /// unparsable record as [`CodecError::Malformed`].
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        loop {
            self.buf.clear();
            let n = self.source.read_until(b'\n', &mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.line += 1;

            let terminated = self.buf.last() == Some(&b'\n');
            let record = self.buf.trim_ascii();
            if record.is_empty() {
                if terminated {
                    continue;
                }
                return Ok(None);
            }

            return match serde_json::from_slice::<Frame>(record) {
                Ok(frame) => Ok(Some(frame)),
                Err(e) if !terminated && e.is_eof() => Err(CodecError::Truncated { line: self.line }),
                Err(source) => Err(CodecError::Malformed {
                    line: self.line,
                    source,
                }),
            };
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub const fn line(&self) -> u64 {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_433_152_800_000 + millis).unwrap()
    }

    async fn decode_all(data: &[u8]) -> (Vec<Frame>, Option<CodecError>) {
        let mut reader = FrameReader::new(data);
        let mut frames = Vec::new();
        loop {
            match reader.next_frame().await {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return (frames, None),
                Err(e) => return (frames, Some(e)),
            }
        }
    }

    #[test]
    fn line_format() {
        let frame = Frame::new(ts(0), b"hi".to_vec());
        let line = String::from_utf8(frame.to_line().unwrap()).unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains("\"content\":\"aGk=\""));
        assert!(line.contains("\"timestamp\":\"2015-06-01T10:00:00"));
    }

    #[test]
    fn delay_clamps_backwards_clock() {
        let frame = Frame::new(ts(100), Vec::new());
        assert_eq!(frame.delay_since(ts(0)), Duration::from_millis(100));
        assert_eq!(frame.delay_since(ts(500)), Duration::ZERO);
    }

    #[tokio::test]
    async fn writer_then_reader() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame(&Frame::new(ts(0), b"\x1b[1mbold\r\n".to_vec())).await.unwrap();
        writer.write_frame(&Frame::new(ts(40), vec![0u8, 255, 10, 13])).await.unwrap();
        assert_eq!(writer.frames(), 2);
        assert_eq!(writer.bytes(), 14);

        let data = writer.finish().await.unwrap();
        let (frames, err) = decode_all(&data).await;
        assert!(err.is_none());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].content, b"\x1b[1mbold\r\n");
        assert_eq!(frames[1].content, vec![0u8, 255, 10, 13]);
        assert_eq!(frames[1].timestamp, ts(40));
    }

    #[tokio::test]
    async fn reads_offset_timestamps_and_null_content() {
        let data = b"{\"timestamp\":\"2015-06-01T03:00:00.5-07:00\",\"content\":null}\n";
        let (frames, err) = decode_all(data).await;
        assert!(err.is_none());
        assert_eq!(frames[0].timestamp, ts(500));
        assert!(frames[0].content.is_empty());
    }

    #[tokio::test]
    async fn empty_stream_is_clean_end() {
        let (frames, err) = decode_all(b"").await;
        assert!(frames.is_empty());
        assert!(err.is_none());

        let (frames, err) = decode_all(b"\n\n  ").await;
        assert!(frames.is_empty());
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn truncated_final_record() {
        let mut data = Frame::new(ts(0), b"one".to_vec()).to_line().unwrap();
        data.extend_from_slice(b"{\"timestamp\":\"2015-06-01T10:00:00Z\",\"content\":\"dHd");

        let (frames, err) = decode_all(&data).await;
        assert_eq!(frames.len(), 1);
        match err {
            Some(CodecError::Truncated { line }) => assert_eq!(line, 2),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn final_record_without_newline_is_accepted() {
        let mut data = Frame::new(ts(0), b"last".to_vec()).to_line().unwrap();
        data.pop();
        let (frames, err) = decode_all(&data).await;
        assert!(err.is_none());
        assert_eq!(frames[0].content, b"last");
    }

    #[tokio::test]
    async fn malformed_record() {
        let (frames, err) = decode_all(b"not json\n").await;
        assert!(frames.is_empty());
        assert!(matches!(err, Some(CodecError::Malformed { line: 1, .. })));

        let bad_base64 = b"{\"timestamp\":\"2015-06-01T10:00:00Z\",\"content\":\"***\"}\n";
        let (_, err) = decode_all(bad_base64).await;
        assert!(matches!(err, Some(CodecError::Malformed { .. })));
    }
}
