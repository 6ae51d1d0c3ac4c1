//! Integration tests for playing recordings served over HTTP.

use chrono::{DateTime, TimeZone, Utc};
use termrec::{Error, Frame, PlaybackConfig, Player, Source};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn at(millis: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 6, 1, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(millis)
}

/// Serve one canned HTTP response on a loopback port and return its URL.
async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}/session.json")
}

#[tokio::test]
async fn remote_recording_is_streamed_and_played() {
    let frames = [
        Frame::new(at(0), b"hello ".to_vec()),
        Frame::new(at(50), b"world".to_vec()),
    ];
    let body: Vec<u8> = frames.iter().flat_map(|f| f.to_line().unwrap()).collect();
    let url = serve_once("200 OK", body).await;

    let source = Source::parse(&url).unwrap();
    assert!(source.is_remote());
    let reader = source.open().await.unwrap();

    let (output, mut played) = tokio::io::duplex(1024);
    let summary = Player::new(output, PlaybackConfig::default())
        .play(reader)
        .await
        .unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(summary.bytes, 11);

    let mut text = String::new();
    played.read_to_string(&mut text).await.unwrap();
    assert_eq!(text, "hello world");
}

#[tokio::test]
async fn not_found_is_an_http_status_error() {
    let url = serve_once("404 Not Found", b"missing".to_vec()).await;

    let err = Source::parse(&url).unwrap().open().await.err().unwrap();
    match err {
        Error::HttpStatus { url: failed, status } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(failed, url);
        }
        other => panic!("expected http status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_a_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/session.json");
    let err = Source::parse(&url).unwrap().open().await.err().unwrap();
    assert!(matches!(err, Error::Fetch { .. }), "got {err:?}");
}

#[tokio::test]
async fn remote_play_fails_before_output_on_bad_status() {
    let url = serve_once("500 Internal Server Error", Vec::new()).await;

    let err = termrec::play(&url, PlaybackConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { .. }));
}
