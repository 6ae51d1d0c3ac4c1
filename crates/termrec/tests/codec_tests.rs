//! Integration tests for the recording format.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;
use termrec::{CodecError, Frame, FrameReader, FrameWriter};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

async fn encode(frames: &[Frame]) -> Vec<u8> {
    let mut writer = FrameWriter::new(Vec::new());
    for frame in frames {
        writer.write_frame(frame).await.unwrap();
    }
    writer.finish().await.unwrap()
}

async fn decode(data: &[u8]) -> (Vec<Frame>, Option<CodecError>) {
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

fn frames_from(chunks: Vec<Vec<u8>>, gaps: &[u32]) -> Vec<Frame> {
    let mut ts = Utc.with_ymd_and_hms(2015, 6, 1, 10, 0, 0).unwrap();
    chunks
        .into_iter()
        .zip(gaps.iter().cycle())
        .map(|(chunk, gap)| {
            ts += ChronoDuration::nanoseconds(i64::from(*gap));
            Frame::new(ts, chunk)
        })
        .collect()
}

proptest! {
    #[test]
    fn arbitrary_chunks_survive(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..512), 0..24),
        gaps in prop::collection::vec(0u32..2_000_000_000, 1..8),
    ) {
        let frames = frames_from(chunks, &gaps);
        let (decoded, err) = runtime().block_on(async {
            let data = encode(&frames).await;
            decode(&data).await
        });
        prop_assert!(err.is_none());
        prop_assert_eq!(decoded, frames);
    }

    #[test]
    fn cut_recording_never_loses_frames_silently(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..8),
        cut in 1usize..40,
    ) {
        let frames = frames_from(chunks, &[1_000]);
        let (decoded, err, complete) = runtime().block_on(async {
            let data = encode(&frames).await;
            let keep = data.len().saturating_sub(cut).max(1);
            let (decoded, err) = decode(&data[..keep]).await;
            (decoded, err, data.len() - keep <= 1)
        });

        prop_assert!(decoded.len() <= frames.len());
        prop_assert_eq!(&decoded[..], &frames[..decoded.len()]);
        if complete {
            prop_assert!(err.is_none());
            prop_assert_eq!(decoded.len(), frames.len());
        } else {
            prop_assert!(err.is_some());
        }
    }
}

#[tokio::test]
async fn decodes_recordings_from_other_writers() {
    let data = concat!(
        "{\"timestamp\":\"2015-06-01T10:00:00.000000001Z\",\"content\":\"JCA=\"}\n",
        "\n",
        "{\"timestamp\":\"2015-06-01T12:00:00.5+02:00\",\"content\":\"bHMNCg==\"}\n",
    );
    let (frames, err) = decode(data.as_bytes()).await;
    assert!(err.is_none());
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].content, b"$ ");
    assert_eq!(frames[1].content, b"ls\r\n");
    assert_eq!(
        frames[1].delay_since(frames[0].timestamp),
        std::time::Duration::from_nanos(499_999_999)
    );
}

#[tokio::test]
async fn malformed_line_reports_position() {
    let good = encode(&frames_from(vec![b"a".to_vec()], &[0])).await;
    let mut data = good.clone();
    data.extend_from_slice(b"{\"timestamp\":42,\"content\":\"\"}\n");
    data.extend_from_slice(&good);

    let (frames, err) = decode(&data).await;
    assert_eq!(frames.len(), 1);
    match err {
        Some(CodecError::Malformed { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected malformed record, got {other:?}"),
    }
}
