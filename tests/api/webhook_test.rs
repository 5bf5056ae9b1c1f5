use super::*;

const ACK: &str = "Hello API Event Received";

#[tokio::test]
async fn all_signed_event_completes_session_and_allows_repeat_downloads() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/signature_request/files/{REQUEST_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 final".to_vec()))
        .expect(2)
        .mount(&server)
        .await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (status, body) =
        post_form_event(&router, &dropbox_event("signature_request_all_signed", REQUEST_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);

    let status = status_of(&router, &session_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["documents_available"], true);
    assert!(status["signed_at"].is_string());

    for _ in 0..2 {
        let request = Request::builder()
            .uri(format!("/download-document/{session_id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, bytes) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[..], b"%PDF-1.4 final");
    }
}

#[tokio::test]
async fn duplicate_all_signed_keeps_first_signed_at() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;
    let event = dropbox_event("signature_request_all_signed", REQUEST_ID);

    post_form_event(&router, &event).await;
    let first = status_of(&router, &session_id).await;
    post_form_event(&router, &event).await;
    let second = status_of(&router, &session_id).await;

    assert_eq!(first["signed_at"], second["signed_at"]);
    assert_eq!(second["status"], "completed");
}

#[tokio::test]
async fn decline_is_terminal_against_later_completion() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, false);
    let session_id = create_session(&router).await;

    let mut declined = dropbox_event("signature_request_declined", REQUEST_ID);
    declined["signature_request"]["response_data"] = json!({ "decline_reason": "Wrong address" });
    post_webhook(&router, "application/json", declined.to_string()).await;
    post_form_event(&router, &dropbox_event("signature_request_all_signed", REQUEST_ID)).await;

    let status = status_of(&router, &session_id).await;
    assert_eq!(status["status"], "declined");
    assert_eq!(status["decline_reason"], "Wrong address");
    assert!(status["signed_at"].is_null());

    let (status, _) = get_json(&router, &format!("/download-document/{session_id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 종결 세션에는 강제 완료도 적용되지 않습니다.
    let (_, body) = post_empty(&router, &format!("/force-completion/{session_id}")).await;
    assert_eq!(body["status"], "declined");
}

#[tokio::test]
async fn cancel_event_voids_session() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    post_form_event(&router, &dropbox_event("signature_request_canceled", REQUEST_ID)).await;
    assert_eq!(status_of(&router, &session_id).await["status"], "voided");
}

#[tokio::test]
async fn partial_signature_keeps_session_sent() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    post_form_event(&router, &dropbox_event("signature_request_signed", REQUEST_ID)).await;
    assert_eq!(status_of(&router, &session_id).await["status"], "sent");
}

#[tokio::test]
async fn multipart_event_is_accepted() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let payload = dropbox_event("signature_request_all_signed", REQUEST_ID);
    let body = format!(
        "--XBOUNDARY\r\n\
         Content-Disposition: form-data; name=\"json\"\r\n\r\n\
         {payload}\r\n\
         --XBOUNDARY--\r\n"
    );
    let (status, ack) =
        post_webhook(&router, "multipart/form-data; boundary=XBOUNDARY", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, ACK);
    assert_eq!(status_of(&router, &session_id).await["status"], "completed");
}

fn connect_completed() -> String {
    json!({
        "event": "envelope-completed",
        "apiVersion": "v2.1",
        "data": { "envelopeId": REQUEST_ID }
    })
    .to_string()
}

#[tokio::test]
async fn signed_docusign_connect_event_is_applied() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let body = connect_completed();
    let signature = DocuSignConnectFormat::signature(CONNECT_KEY, body.as_bytes());
    let (status, ack) = post_signed_webhook(&router, &signature, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, ACK);
    assert_eq!(status_of(&router, &session_id).await["status"], "completed");
}

#[tokio::test]
async fn unsigned_docusign_connect_event_is_ignored() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    // 서명 헤더 없음
    let (status, ack) = post_webhook(&router, "application/json", connect_completed()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, ACK);

    // 다른 키로 만든 서명
    let body = connect_completed();
    let signature = DocuSignConnectFormat::signature("wrong-key", body.as_bytes());
    post_signed_webhook(&router, &signature, body).await;

    let status = status_of(&router, &session_id).await;
    assert_eq!(status["status"], "sent");
    assert_eq!(status["documents_available"], false);
}

#[tokio::test]
async fn forged_event_hash_is_acknowledged_but_ignored() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let mut payload = dropbox_event("signature_request_all_signed", REQUEST_ID);
    payload["event"]["event_hash"] = json!("00".repeat(32));
    let (status, body) = post_form_event(&router, &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
    assert_eq!(status_of(&router, &session_id).await["status"], "sent");
}

#[tokio::test]
async fn unknown_or_malformed_events_are_acknowledged() {
    let server = MockServer::start().await;
    let router = router(&server, true);

    let (status, body) =
        post_form_event(&router, &dropbox_event("signature_request_all_signed", "unknown-ref")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);

    let (status, body) = post_webhook(&router, "application/json", "not json at all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);

    let (status, body) =
        post_form_event(&router, &dropbox_event("callback_test", "unknown-ref")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}
