mod signing_test;
mod sync_test;
mod webhook_test;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use signflow::build_router;
use signflow::config::ProviderConfig;
use signflow::db::MemorySessionStore;
use signflow::routes::AppState;
use signflow::services::{DocuSignConnectFormat, DropboxSignClient, DropboxSignFormat};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-api-key";
const CONNECT_KEY: &str = "test-connect-key";
const REQUEST_ID: &str = "fa5c8a0b0f492d768749333ad6fcc214c111e967";
const SIGNATURE_ID: &str = "78caf2a1d01cd39cea2bc1cbb340dac3";

fn provider_config(server: &MockServer, verify_events: bool) -> ProviderConfig {
    ProviderConfig {
        api_key: API_KEY.to_string(),
        client_id: "client-123".to_string(),
        template_id: "tpl-456".to_string(),
        api_base_url: server.uri(),
        test_mode: true,
        verify_events,
        docusign_connect_key: Some(CONNECT_KEY.to_string()),
        timeout: Duration::from_secs(5),
    }
}

fn router(server: &MockServer, verify_events: bool) -> Router {
    let config = provider_config(server, verify_events);
    let provider = Arc::new(DropboxSignClient::new(config.clone()).expect("provider client"));
    let state = AppState::new(Arc::new(MemorySessionStore::new()), provider, &config, 60);
    build_router(state)
}

/// 생성 + 서명 URL 발급에 성공하는 제공자 목을 등록합니다.
async fn mount_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/signature_request/create_embedded_with_template"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signature_request": {
                "signature_request_id": REQUEST_ID,
                "signatures": [{
                    "signature_id": SIGNATURE_ID,
                    "signer_email_address": "ann@example.com",
                    "signer_role": "signer"
                }]
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/embedded/sign_url/{SIGNATURE_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedded": {
                "sign_url": "https://app.hellosign.com/editor/embeddedSign?signature_id=78caf2a1",
                "expires_at": 1_700_003_600
            }
        })))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, complete: bool, declined: bool, errored: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/signature_request/{REQUEST_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signature_request": {
                "signature_request_id": REQUEST_ID,
                "is_complete": complete,
                "is_declined": declined,
                "has_error": errored
            }
        })))
        .mount(server)
        .await;
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    (status, headers, bytes)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).expect("request");
    let (status, _, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let (status, _, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post_empty(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    let (status, _, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// 웹훅을 보내고 (상태 코드, 본문 문자열)을 돌려줍니다.
async fn post_webhook(router: &Router, content_type: &str, body: impl Into<Body>) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", content_type)
        .body(body.into())
        .expect("request");
    let (status, _, bytes) = send(router, request).await;
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// DocuSign Connect 서명 헤더를 붙여 JSON 웹훅을 보냅니다.
async fn post_signed_webhook(router: &Router, signature: &str, body: String) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-docusign-signature-1", signature)
        .body(Body::from(body))
        .expect("request");
    let (status, _, bytes) = send(router, request).await;
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Dropbox Sign 방식(form 본문의 `json` 필드)으로 웹훅을 보냅니다.
async fn post_form_event(router: &Router, payload: &Value) -> (StatusCode, String) {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("json", &payload.to_string())
        .finish();
    post_webhook(router, "application/x-www-form-urlencoded", body).await
}

fn dropbox_event(event_type: &str, request_id: &str) -> Value {
    let event_time = "1700000000";
    json!({
        "event": {
            "event_type": event_type,
            "event_time": event_time,
            "event_hash": DropboxSignFormat::event_hash(API_KEY, event_time, event_type),
            "event_metadata": {}
        },
        "signature_request": {
            "signature_request_id": request_id
        }
    })
}

fn ann() -> Value {
    json!({
        "email": "ann@example.com",
        "name": "Ann Example",
        "role": "signer",
        "phone": null
    })
}

/// 세션을 하나 만들고 session_id를 돌려줍니다.
async fn create_session(router: &Router) -> String {
    let (status, body) = post_json(router, "/create-signing-session", ann()).await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body["session_id"].as_str().expect("session_id").to_string()
}

async fn status_of(router: &Router, session_id: &str) -> Value {
    let (status, body) = get_json(router, &format!("/signing-status/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    body
}
