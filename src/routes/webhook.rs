//! # 제공자 웹훅 라우트
//!
//! `POST /webhook`
//!
//! 본문 형식:
//! - `application/json`: 본문 전체가 이벤트
//! - `application/x-www-form-urlencoded`: `json` 필드에 이벤트 JSON
//! - `multipart/form-data`: `json` 파트에 이벤트 JSON
//!
//! 처리 결과와 관계없이 항상 200과 확인 문자열로 응답합니다.
//! 제공자는 이 문자열이 없으면 같은 이벤트를 재전송합니다.

use axum::{
    body::{Body, Bytes},                              // Bytes: 참조 카운트 기반 바이트 버퍼 (clone이 저렴)
    extract::{FromRequest, Multipart, Request, State}, // FromRequest: 추출기를 핸들러 밖에서 직접 호출할 때 사용
    http::{header, HeaderMap, StatusCode},
};
use serde_json::Value;

use crate::routes::AppState;
use crate::services::webhook::{
    DispatchOutcome, WebhookDelivery, ACK_BODY, DOCUSIGN_SIGNATURE_HEADER,
};

/// 제공자 콜백을 받아 세션 전이로 바꿉니다.
///
/// 서명 검증에 원시 본문이 필요하므로 본문을 먼저 바이트로 모두 읽고,
/// multipart라면 그 바이트로 다시 파싱합니다.
pub async fn provider_callback(
    State(state): State<AppState>,
    request: Request,
) -> (StatusCode, &'static str) {
    // 본문을 읽으면 request가 소비(move)되므로 헤더를 먼저 복사해 둡니다.
    let headers = request.headers().clone();
    let content_type = header_str(&headers, header::CONTENT_TYPE.as_str());
    let signature = header_str(&headers, DOCUSIGN_SIGNATURE_HEADER);

    let body = match Bytes::from_request(request, &state).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read webhook body, acknowledging");
            return (StatusCode::OK, ACK_BODY);
        }
    };

    let delivery = WebhookDelivery {
        content_type,
        signature,
        body: &body[..],
    };

    let is_multipart = content_type
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

    let outcome = if is_multipart {
        match multipart_payload(&headers, body.clone(), &state).await {
            Some(payload) => state.dispatcher.dispatch(&payload, &delivery).await,
            None => {
                tracing::warn!("Multipart webhook had no readable json part, acknowledging");
                DispatchOutcome::Malformed("missing json part".to_string())
            }
        }
    } else {
        state.dispatcher.dispatch_body(&delivery).await
    };

    tracing::debug!(?outcome, "Webhook handled");
    (StatusCode::OK, ACK_BODY)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// 이미 읽은 본문으로 요청을 다시 만들어 multipart의 `json` 파트를 꺼냅니다.
async fn multipart_payload(headers: &HeaderMap, body: Bytes, state: &AppState) -> Option<Value> {
    let mut request = Request::new(Body::from(body));
    *request.headers_mut() = headers.clone();

    let mut multipart = Multipart::from_request(request, state).await.ok()?;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("json") {
            let text = field.text().await.ok()?;
            return serde_json::from_str(&text).ok();
        }
    }
    None
}
