#![allow(clippy::unwrap_used)]
// End-to-end tests: a `Session` against a local `/ws/view` server, with
// wiremock standing in for Tilt's HTTP action endpoints.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tiltview_api::{Endpoint, TiltClient};
use tiltview_core::{ConnectionState, CoreError, DisableState, ServerConfig, Session, SessionPhase};

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

fn resource(name: &str, labels: Value, disable: Option<&str>) -> Value {
    let mut status = json!({ "runtimeStatus": "ok", "updateStatus": "ok", "order": 1 });
    if let Some(state) = disable {
        status["disableStatus"] = json!({ "state": state, "sources": [], "enabledCount": 1 });
    }
    json!({
        "metadata": {
            "name": name,
            "uid": format!("uid-{name}"),
            "resourceVersion": "1",
            "creationTimestamp": "2024-06-15T10:30:00Z",
            "labels": labels,
        },
        "status": status,
    })
}

fn button(name: &str, version: &str) -> Value {
    json!({
        "metadata": { "name": name, "resourceVersion": version },
        "spec": {
            "location": { "componentID": "api", "componentType": "Resource" },
            "text": "Disable Resource",
        }
    })
}

fn snapshot_frame() -> String {
    json!({
        "isComplete": true,
        "logList": { "segments": [], "spans": { "s1": { "manifestName": "web" } } },
        "uiResources": [
            resource("web", json!({ "frontend": "frontend" }), None),
            resource("api", json!({}), Some("Enabled")),
        ],
        "uiButtons": [button("api-disable", "7")],
    })
    .to_string()
}

fn labeled_snapshot(name: &str, label: &str) -> String {
    json!({
        "isComplete": true,
        "logList": { "segments": [], "spans": {} },
        "uiResources": [resource(name, json!({ label: label }), None)],
        "uiButtons": [],
    })
    .to_string()
}

/// Serve `frames` to every client that connects, then hold the socket
/// open until the client leaves.
async fn serve_view(frames: Vec<String>) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (port, serve_connections(listener, vec![frames]))
}

/// The n-th client gets `per_connection[n]`; clients past the end get the
/// last entry. Every connection but the last is closed by the server once
/// its frames are sent.
fn serve_connections(listener: TcpListener, per_connection: Vec<Vec<String>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let last = per_connection.len() - 1;
        let mut accepted = 0;
        while let Ok((stream, _)) = listener.accept().await {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            let index = accepted.min(last);
            accepted += 1;
            let frames = per_connection[index].clone();
            tokio::spawn(async move {
                for frame in frames {
                    if ws.send(Message::text(frame)).await.is_err() {
                        return;
                    }
                }
                if index < last {
                    let _ = ws.close(None).await;
                    return;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    })
}

fn fast_config(port: u16) -> ServerConfig {
    ServerConfig::new("127.0.0.1", port).with_health_check_interval(Duration::from_millis(50))
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// ── View stream ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshot_builds_label_tree() {
    let (port, server) = serve_view(vec![snapshot_frame()]).await;
    let session = Session::new(fast_config(port)).unwrap();
    session.start().await;

    let view = session.wait_until_initialized(WAIT).await.unwrap();

    assert_eq!(view.list_labels(), ["unlabeled", "frontend"]);
    let frontend = view.list_resources_for_label("frontend");
    assert_eq!(frontend.len(), 1);
    assert_eq!(frontend[0].name(), "web");
    let unlabeled = view.list_resources_for_label("unlabeled");
    assert_eq!(unlabeled[0].name(), "api");
    assert_eq!(view.manifests(), ["web"]);
    assert_eq!(session.phase(), SessionPhase::ConnectedInitialized);

    session.shutdown().await;
    assert_eq!(session.state(), ConnectionState::Disconnected);
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delta_after_snapshot_moves_resource() {
    let delta = json!({
        "uiResources": [resource("web", json!({ "backend": "backend" }), None)],
    })
    .to_string();
    let (port, server) = serve_view(vec![snapshot_frame(), delta]).await;
    let session = Session::new(fast_config(port)).unwrap();
    let mut changes = session.change_subscription();
    session.start().await;

    let view = tokio::time::timeout(WAIT, async {
        loop {
            let view = changes.changed().await.unwrap();
            if view.list_labels().iter().any(|l| l == "backend") {
                return view;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(view.list_labels(), ["unlabeled", "backend"]);
    assert!(view.list_resources_for_label("frontend").is_empty());

    session.shutdown().await;
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resync_rebuilds_state_in_new_epoch() {
    let (port, server) = serve_view(vec![snapshot_frame()]).await;
    let session = Session::new(fast_config(port)).unwrap();
    session.start().await;
    let first = session.wait_until_initialized(WAIT).await.unwrap();

    session.resync().await;

    let second = session.wait_until_initialized(WAIT).await.unwrap();
    assert!(second.epoch() > first.epoch());
    assert_eq!(second.list_labels(), first.list_labels());
    assert_eq!(second.resource_count(), first.resource_count());

    session.shutdown().await;
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_close_reconnects_into_fresh_state() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = serve_connections(
        listener,
        vec![
            vec![labeled_snapshot("one", "first")],
            vec![labeled_snapshot("two", "second")],
        ],
    );
    let session = Session::new(fast_config(port)).unwrap();
    let mut changes = session.change_subscription();
    session.start().await;

    let view = tokio::time::timeout(WAIT, async {
        loop {
            let view = changes.changed().await.unwrap();
            if view.list_labels() == ["second"] {
                return view;
            }
        }
    })
    .await
    .unwrap();

    // Initial reset, then one more after the server closed the stream.
    assert!(view.epoch() >= 2, "epoch {}", view.epoch());
    assert!(view.list_resources_for_label("first").is_empty());
    assert!(session.get_resource("one").is_none());
    assert_eq!(session.get_resource("two").unwrap().name(), "two");
    assert_eq!(session.phase(), SessionPhase::ConnectedInitialized);

    session.shutdown().await;
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_connects_once_server_comes_up() {
    let port = free_port().await;
    let session = Session::new(fast_config(port)).unwrap();
    session.start().await;

    // Several failed attempts go by with nothing to show.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_ne!(session.phase(), SessionPhase::ConnectedInitialized);
    assert!(session.list_labels().is_empty());

    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let server = serve_connections(listener, vec![vec![labeled_snapshot("svc", "late")]]);

    let view = session.wait_until_initialized(WAIT).await.unwrap();
    assert_eq!(view.list_labels(), ["late"]);
    assert_eq!(session.phase(), SessionPhase::ConnectedInitialized);
    assert!(session.last_error().is_none());

    session.shutdown().await;
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_stops_reconnects() {
    let (port, server) = serve_view(vec![snapshot_frame()]).await;
    let session = Session::new(fast_config(port)).unwrap();
    session.start().await;
    session.wait_until_initialized(WAIT).await.unwrap();

    session.shutdown().await;
    session.resync().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(session.phase(), SessionPhase::Disconnected);
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_server_records_error() {
    let port = free_port().await;
    let config = ServerConfig::new("127.0.0.1", port)
        .with_health_check_interval(Duration::from_millis(200));
    let session = Session::new(config).unwrap();
    session.start().await;

    let err = session
        .wait_until_initialized(Duration::from_millis(500))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ConnectionFailed { .. }), "got {err:?}");
    assert!(session.list_labels().is_empty());
    session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hidden_session_stays_disconnected() {
    let (port, server) = serve_view(vec![snapshot_frame()]).await;
    let session = Session::new(fast_config(port)).unwrap();
    session.set_visible(false);
    session.start().await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.phase(), SessionPhase::Disconnected);

    session.set_visible(true);
    session.wait_until_initialized(WAIT).await.unwrap();

    session.shutdown().await;
    server.abort();
}

// ── Actions ─────────────────────────────────────────────────────────

async fn session_with_actions() -> (Session, MockServer, JoinHandle<()>) {
    let (port, server) = serve_view(vec![snapshot_frame()]).await;
    let http = MockServer::start().await;
    let uri = Url::parse(&http.uri()).unwrap();
    let client = TiltClient::new(Endpoint::new(uri.host_str().unwrap(), uri.port().unwrap())).unwrap();

    let session = Session::with_client(fast_config(port), client);
    session.start().await;
    session.wait_until_initialized(WAIT).await.unwrap();
    (session, http, server)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_toggle_sends_fresh_button_version() {
    let (session, http, server) = session_with_actions().await;

    Mock::given(method("PUT"))
        .and(path("/proxy/apis/tilt.dev/v1alpha1/uibuttons/api-disable/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&http)
        .await;

    let state = session.toggle_enable("api").await.unwrap();
    assert_eq!(state, DisableState::Enabled);

    let requests = http.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["metadata"], json!({ "resourceVersion": "7", "name": "api-disable" }));
    assert_eq!(
        body["status"]["inputs"],
        json!([{ "name": "action", "hidden": { "value": "on" } }])
    );
    let clicked_at = body["status"]["lastClickedAt"].as_str().unwrap();
    assert!(clicked_at.ends_with('Z'));
    assert_eq!(clicked_at.rsplit('.').next().unwrap().len(), "000000Z".len());

    session.shutdown().await;
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_toggle_without_disable_status_is_refused() {
    let (session, _http, server) = session_with_actions().await;

    let err = session.toggle_enable("web").await.unwrap_err();
    assert!(matches!(err, CoreError::NotToggleable { ref name } if name == "web"));

    session.shutdown().await;
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_rejection_is_returned() {
    let (session, http, server) = session_with_actions().await;

    Mock::given(method("POST"))
        .and(path("/api/trigger"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&http)
        .await;

    let err = session.restart("web").await.unwrap_err();
    assert!(matches!(err, CoreError::Rejected { status: 404, .. }), "got {err:?}");
    // Rejections leave the view untouched.
    assert!(session.view().is_initialized());

    session.shutdown().await;
    server.abort();
}
