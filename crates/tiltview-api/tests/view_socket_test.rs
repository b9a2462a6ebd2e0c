#![allow(clippy::unwrap_used)]
// ViewSocket against a local WebSocket server that closes the stream.

use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_util::sync::CancellationToken;
use url::Url;

use tiltview_api::{Error, ViewSocket};

/// Accept one client, send `frames`, then close with `code`.
async fn serve_then_close(frames: Vec<&'static str>, code: CloseCode) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        let _ = ws
            .close(Some(CloseFrame {
                code,
                reason: Utf8Bytes::from_static("restarting"),
            }))
            .await;
    });

    Url::parse(&format!("ws://127.0.0.1:{port}/ws/view")).unwrap()
}

#[tokio::test]
async fn test_normal_close_ends_cleanly() {
    let url = serve_then_close(vec!["{\"a\":1}", "{\"b\":2}"], CloseCode::Normal).await;
    let socket = ViewSocket::connect(&url).await.unwrap();

    let mut seen = Vec::new();
    socket
        .read_until_closed(&CancellationToken::new(), |text| seen.push(text.to_owned()))
        .await
        .unwrap();

    assert_eq!(seen, ["{\"a\":1}", "{\"b\":2}"]);
}

#[tokio::test]
async fn test_abnormal_close_reports_code_and_reason() {
    let url = serve_then_close(vec!["{}"], CloseCode::Away).await;
    let socket = ViewSocket::connect(&url).await.unwrap();

    let mut seen = 0;
    let err = socket
        .read_until_closed(&CancellationToken::new(), |_| seen += 1)
        .await
        .unwrap_err();

    assert_eq!(seen, 1);
    assert!(
        matches!(err, Error::WebSocketClosed { code: 1001, ref reason } if reason == "restarting"),
        "got {err:?}"
    );
}
