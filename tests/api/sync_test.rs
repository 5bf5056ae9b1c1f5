use super::*;

#[tokio::test]
async fn sync_with_pending_provider_keeps_session_sent() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, false, false, false).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (status, body) = post_empty(&router, &format!("/sync-status/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sent");
    assert_eq!(body["provider_request_id"], REQUEST_ID);
    assert!(body["last_sync"].is_string());

    assert_eq!(status_of(&router, &session_id).await["status"], "sent");
}

#[tokio::test]
async fn sync_with_complete_provider_completes_session() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, true, false, false).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (_, first) = post_empty(&router, &format!("/sync-status/{session_id}")).await;
    assert_eq!(first["status"], "completed");
    let signed_at = status_of(&router, &session_id).await["signed_at"].clone();
    assert!(signed_at.is_string());

    // 반복 동기화는 signed_at을 바꾸지 않습니다.
    post_empty(&router, &format!("/sync-status/{session_id}")).await;
    let status = status_of(&router, &session_id).await;
    assert_eq!(status["signed_at"], signed_at);
    assert_eq!(status["documents_available"], true);
}

#[tokio::test]
async fn sync_with_declined_provider_declines_session() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, false, true, false).await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (_, body) = post_empty(&router, &format!("/sync-status/{session_id}")).await;
    assert_eq!(body["status"], "declined");
    assert!(status_of(&router, &session_id).await["declined_at"].is_string());
}

#[tokio::test]
async fn sync_does_not_override_terminal_decline() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_status(&server, true, false, false).await;
    let router = router(&server, false);
    let session_id = create_session(&router).await;

    post_form_event(&router, &dropbox_event("signature_request_declined", REQUEST_ID)).await;
    let (_, body) = post_empty(&router, &format!("/sync-status/{session_id}")).await;
    assert_eq!(body["status"], "declined");
}

#[tokio::test]
async fn provider_outage_surfaces_as_server_error() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/signature_request/{REQUEST_ID}")))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (status, body) = post_empty(&router, &format!("/sync-status/{session_id}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "provider_error");
    assert_eq!(status_of(&router, &session_id).await["status"], "sent");
}
