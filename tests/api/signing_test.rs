use super::*;

#[tokio::test]
async fn health_reports_healthy() {
    let server = MockServer::start().await;
    let router = router(&server, true);

    let (status, body) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn create_returns_signing_details_and_sent_status() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);

    let (status, body) = post_json(&router, "/create-signing-session", ann()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_request_id"], REQUEST_ID);
    assert_eq!(body["provider_client_id"], "client-123");
    assert!(body["signing_url"]
        .as_str()
        .unwrap()
        .starts_with("https://app.hellosign.com/editor/embeddedSign"));

    let session_id = body["session_id"].as_str().unwrap();
    let status = status_of(&router, session_id).await;
    assert_eq!(status["status"], "sent");
    assert_eq!(status["documents_available"], false);
    assert_eq!(status["expired"], false);
    assert!(status["signed_at"].is_null());
}

#[tokio::test]
async fn create_sends_template_and_signer_to_provider() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    let router = router(&server, true);

    create_session(&router).await;

    let requests = server.received_requests().await.expect("recorded requests");
    let create = requests
        .iter()
        .find(|r| r.url.path() == "/signature_request/create_embedded_with_template")
        .expect("create call");
    let form: Vec<(String, String)> = url::form_urlencoded::parse(&create.body)
        .into_owned()
        .collect();
    let field = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(field("client_id"), Some("client-123"));
    assert_eq!(field("template_ids[0]"), Some("tpl-456"));
    assert_eq!(field("signers[signer][email_address]"), Some("ann@example.com"));
    assert_eq!(field("test_mode"), Some("1"));
    assert!(create.headers.contains_key("authorization"));
}

#[tokio::test]
async fn provider_error_envelope_fails_creation_without_session() {
    let server = MockServer::start().await;
    // HTTP 200이지만 본문에 에러 객체
    Mock::given(method("POST"))
        .and(path("/signature_request/create_embedded_with_template"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "error_msg": "Template not found", "error_name": "not_found" }
        })))
        .mount(&server)
        .await;
    let router = router(&server, true);

    let (status, body) = post_json(&router, "/create-signing-session", ann()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "provider_error");
    // 제공자 세부 메시지는 노출하지 않습니다.
    assert!(!body.to_string().contains("Template not found"));
}

#[tokio::test]
async fn invalid_signer_is_rejected_before_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let router = router(&server, true);

    let (status, body) = post_json(
        &router,
        "/create-signing-session",
        json!({ "email": "ann-at-example", "name": "Ann Example" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn role_cannot_inject_form_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signature_request/create_embedded_with_template"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let router = router(&server, true);

    let (status, body) = post_json(
        &router,
        "/create-signing-session",
        json!({
            "email": "ann@example.com",
            "name": "Ann Example",
            "role": "signer][email_address]=mallory@example.com&signers[signer"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_session_is_not_found_everywhere() {
    let server = MockServer::start().await;
    let router = router(&server, true);

    let (status, _) = get_json(&router, "/signing-status/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&router, "/download-document/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post_empty(&router, "/sync-status/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post_empty(&router, "/force-completion/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_before_completion_is_not_ready() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/signature_request/files/{REQUEST_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (status, body) = get_json(&router, &format!("/download-document/{session_id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "not_ready");
}

#[tokio::test]
async fn force_completion_unlocks_download() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/signature_request/files/{REQUEST_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 signed".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    let router = router(&server, true);
    let session_id = create_session(&router).await;

    let (status, body) = post_empty(&router, &format!("/force-completion/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["session_id"], session_id.as_str());

    let request = Request::builder()
        .uri(format!("/download-document/{session_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/pdf");
    assert_eq!(
        headers["content-disposition"],
        format!("attachment; filename=\"signed_document_{session_id}.pdf\"").as_str()
    );
    assert_eq!(&bytes[..], b"%PDF-1.4 signed");
}
