#![allow(clippy::unwrap_used)]
// Integration tests for `TiltClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tiltview_api::models::DisableState;
use tiltview_api::requests::{ButtonStatusUpdate, TriggerRequest};
use tiltview_api::{Endpoint, Error, ResourceVersion, TiltClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, TiltClient) {
    let server = MockServer::start().await;
    let uri = Url::parse(&server.uri()).unwrap();
    let endpoint = Endpoint::new(uri.host_str().unwrap(), uri.port().unwrap());
    let client = TiltClient::with_client(reqwest::Client::new(), endpoint);
    (server, client)
}

fn version(v: &str) -> ResourceVersion {
    ResourceVersion::try_from(v.to_owned()).unwrap()
}

// ── Trigger ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_trigger_posts_manifest_name() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/trigger"))
        .and(body_json(json!({ "manifest_names": ["api"], "build_reason": 16 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .trigger(&TriggerRequest::for_manifest("api"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_trigger_rejection_keeps_json_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/trigger"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "no such manifest" })),
        )
        .mount(&server)
        .await;

    let err = client
        .trigger(&TriggerRequest::for_manifest("ghost"))
        .await
        .unwrap_err();

    match err {
        Error::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, Some(json!({ "error": "no such manifest" })));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_trigger_rejection_with_text_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/trigger"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client
        .trigger(&TriggerRequest::for_manifest("api"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(
        matches!(&err, Error::Rejected { body: Some(serde_json::Value::String(s)), .. } if s == "boom"),
        "unexpected error: {err:?}"
    );
}

// ── Button status ───────────────────────────────────────────────────

#[tokio::test]
async fn test_toggle_puts_button_status() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/proxy/apis/tilt.dev/v1alpha1/uibuttons/api-disable/status"))
        .and(body_json(json!({
            "metadata": { "resourceVersion": "42", "name": "api-disable" },
            "status": {
                "lastClickedAt": "2024-06-15T10:30:00.500000Z",
                "inputs": [{ "name": "action", "hidden": { "value": "off" } }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let update = ButtonStatusUpdate::toggle(
        "api-disable",
        version("42"),
        DisableState::Disabled,
        "2024-06-15T10:30:00.500Z",
    )
    .unwrap();

    client.update_button_status(&update).await.unwrap();
}

#[tokio::test]
async fn test_toggle_conflict_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/proxy/apis/tilt.dev/v1alpha1/uibuttons/api-disable/status"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "kind": "Status",
            "reason": "Conflict"
        })))
        .mount(&server)
        .await;

    let update = ButtonStatusUpdate::toggle(
        "api-disable",
        version("1"),
        DisableState::Enabled,
        "2024-06-15T10:30:00.500Z",
    )
    .unwrap();

    let err = client.update_button_status(&update).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Nothing listens on port 9 on the loopback interface.
    let client = TiltClient::new(Endpoint::new("127.0.0.1", 9)).unwrap();
    let err = client
        .trigger(&TriggerRequest::for_manifest("api"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}
