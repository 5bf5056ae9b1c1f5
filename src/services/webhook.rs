//! # 웹훅 디스패처
//!
//! 제공자가 보낸 원시 이벤트 페이로드를 정규화된 `ProviderEvent`로 바꾸고
//! 라이프사이클 엔진에 전달합니다.
//!
//! ## 처리 순서
//! ```text
//! 원시 본문 ──▶ JSON 추출 ──▶ 형식 판별 ──▶ 인증 ──▶ 정규화 ──▶ 엔진
//!  (JSON / form `json` 필드 / multipart `json` 파트)
//! ```
//!
//! 인증은 형식마다 다릅니다.
//! - Dropbox Sign: 페이로드 안의 `event.event_hash` (API 키로 HMAC-SHA256, hex)
//! - DocuSign Connect: `X-DocuSign-Signature-1` 헤더 (Connect 키로 원시 본문 HMAC-SHA256, base64)
//!
//! 디스패치는 **절대 호출자에게 에러를 돌려주지 않습니다.**
//! 잘못된 페이로드, 모르는 이벤트, 모르는 요청 ID는 모두 로그만 남기고
//! 라우트는 항상 200으로 응답합니다.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::models::{EventKind, ProviderEvent, SessionStatus};
use crate::services::lifecycle::{LifecycleEngine, LifecycleEvent};

type HmacSha256 = Hmac<Sha256>;

/// 제공자가 전달 성공으로 인정하는 응답 본문
pub const ACK_BODY: &str = "Hello API Event Received";

/// DocuSign Connect가 본문 서명을 싣는 헤더
pub const DOCUSIGN_SIGNATURE_HEADER: &str = "x-docusign-signature-1";

/// 웹훅 요청 하나의 원시 정보
///
/// `body`는 multipart를 포함해 받은 그대로의 본문입니다.
/// 본문 전체에 서명하는 형식은 이 바이트로 검증합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookDelivery<'a> {
    pub content_type: Option<&'a str>,
    /// `X-DocuSign-Signature-1` 헤더 값
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

/// 한 제공자의 웹훅 페이로드 형식
pub trait WebhookFormat: Send + Sync {
    fn name(&self) -> &'static str;

    /// 이 형식의 페이로드인지 판별합니다.
    fn recognizes(&self, payload: &Value) -> bool;

    /// 서명 검증. 검증 재료가 없거나 틀리면 false.
    fn authenticate(&self, payload: &Value, delivery: &WebhookDelivery<'_>) -> bool;

    /// `Ok(None)`: 알아봤지만 처리하지 않는 이벤트 종류.
    /// `Err`: 필수 필드가 없는 잘못된 페이로드.
    fn normalize(&self, payload: &Value) -> Result<Option<ProviderEvent>, String>;
}

/// Dropbox Sign 이벤트 형식
///
/// `event.event_type`, `signature_request.signature_request_id`를 읽고,
/// 설정되어 있으면 `event.event_hash`를 API 키로 검증합니다.
pub struct DropboxSignFormat {
    api_key: String,
    verify: bool,
}

impl DropboxSignFormat {
    pub fn new(api_key: impl Into<String>, verify: bool) -> Self {
        Self {
            api_key: api_key.into(),
            verify,
        }
    }

    /// `hex(HMAC-SHA256(api_key, event_time + event_type))`
    pub fn event_hash(api_key: &str, event_time: &str, event_type: &str) -> String {
        keyed_mac(api_key, event_time, event_type)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }
}

fn keyed_mac(api_key: &str, event_time: &str, event_type: &str) -> Option<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(api_key.as_bytes()).ok()?;
    mac.update(event_time.as_bytes());
    mac.update(event_type.as_bytes());
    Some(mac)
}

impl WebhookFormat for DropboxSignFormat {
    fn name(&self) -> &'static str {
        "dropbox_sign"
    }

    fn recognizes(&self, payload: &Value) -> bool {
        payload
            .get("event")
            .and_then(|e| e.get("event_type"))
            .is_some_and(Value::is_string)
    }

    fn authenticate(&self, payload: &Value, _delivery: &WebhookDelivery<'_>) -> bool {
        if !self.verify {
            return true;
        }
        let Some(event) = payload.get("event") else {
            return false;
        };
        let event_type = event.get("event_type").and_then(Value::as_str).unwrap_or_default();
        // event_time은 문자열 또는 숫자로 올 수 있습니다.
        let event_time = match event.get("event_time") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return false,
        };
        let Some(given) = event
            .get("event_hash")
            .and_then(Value::as_str)
            .and_then(|h| hex::decode(h).ok())
        else {
            return false;
        };

        // verify_slice는 상수 시간 비교입니다.
        keyed_mac(&self.api_key, &event_time, event_type)
            .is_some_and(|mac| mac.verify_slice(&given).is_ok())
    }

    fn normalize(&self, payload: &Value) -> Result<Option<ProviderEvent>, String> {
        let event_type = payload
            .pointer("/event/event_type")
            .and_then(Value::as_str)
            .ok_or("missing event.event_type")?;

        let kind = match event_type {
            "signature_request_all_signed" => EventKind::AllSigned,
            "signature_request_signed" => EventKind::SignerSigned,
            "signature_request_declined" => EventKind::Declined,
            "signature_request_canceled" => EventKind::Canceled,
            _ => return Ok(None),
        };

        let provider_request_id = payload
            .pointer("/signature_request/signature_request_id")
            .and_then(Value::as_str)
            .ok_or("missing signature_request.signature_request_id")?
            .to_string();

        let decline_reason = if kind == EventKind::Declined {
            dropbox_decline_reason(payload)
        } else {
            None
        };

        Ok(Some(ProviderEvent {
            kind,
            provider_request_id,
            decline_reason,
        }))
    }
}

fn dropbox_decline_reason(payload: &Value) -> Option<String> {
    let request = payload.get("signature_request")?;
    let from_response_data = request
        .pointer("/response_data/decline_reason")
        .and_then(Value::as_str);
    // 서명 슬롯 목록에 사유가 실려 오는 경우도 있습니다.
    let from_signatures = || {
        request
            .get("signatures")?
            .as_array()?
            .iter()
            .find_map(|s| s.get("decline_reason").and_then(Value::as_str))
    };
    from_response_data
        .or_else(from_signatures)
        .filter(|r| !r.trim().is_empty())
        .map(str::to_string)
}

/// DocuSign Connect 이벤트 형식
///
/// 최상위 `event` 문자열과 `data.envelopeId`를 읽습니다.
/// Connect HMAC 키가 설정된 경우에만 등록되며, 서명 헤더가 없으면 항상 거부합니다.
pub struct DocuSignConnectFormat {
    hmac_key: String,
}

impl DocuSignConnectFormat {
    pub fn new(hmac_key: impl Into<String>) -> Self {
        Self {
            hmac_key: hmac_key.into(),
        }
    }

    /// `base64(HMAC-SHA256(hmac_key, body))`
    pub fn signature(hmac_key: &str, body: &[u8]) -> String {
        body_mac(hmac_key, body)
            .map(|mac| BASE64.encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }
}

fn body_mac(key: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

impl WebhookFormat for DocuSignConnectFormat {
    fn name(&self) -> &'static str {
        "docusign_connect"
    }

    fn authenticate(&self, _payload: &Value, delivery: &WebhookDelivery<'_>) -> bool {
        let Some(given) = delivery
            .signature
            .and_then(|s| BASE64.decode(s.trim()).ok())
        else {
            return false;
        };
        body_mac(&self.hmac_key, delivery.body)
            .is_some_and(|mac| mac.verify_slice(&given).is_ok())
    }

    fn recognizes(&self, payload: &Value) -> bool {
        payload.get("event").is_some_and(Value::is_string)
            && payload.get("data").is_some_and(Value::is_object)
    }

    fn normalize(&self, payload: &Value) -> Result<Option<ProviderEvent>, String> {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .ok_or("missing event")?;

        let kind = match event {
            "envelope-completed" => EventKind::AllSigned,
            "recipient-completed" => EventKind::SignerSigned,
            "envelope-declined" | "recipient-declined" => EventKind::Declined,
            "envelope-voided" => EventKind::Canceled,
            _ => return Ok(None),
        };

        let provider_request_id = payload
            .pointer("/data/envelopeId")
            .and_then(Value::as_str)
            .ok_or("missing data.envelopeId")?
            .to_string();

        let decline_reason = payload
            .pointer("/data/envelopeSummary/recipients/signers")
            .and_then(Value::as_array)
            .and_then(|signers| {
                signers
                    .iter()
                    .find_map(|s| s.get("declinedReason").and_then(Value::as_str))
            })
            .filter(|r| !r.trim().is_empty())
            .map(str::to_string);

        Ok(Some(ProviderEvent {
            kind,
            provider_request_id,
            decline_reason,
        }))
    }
}

/// 디스패치 결과. 응답에는 쓰이지 않고 로그와 테스트에서만 봅니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied(SessionStatus),
    UnknownSession,
    IgnoredEvent(String),
    Unauthenticated,
    Malformed(String),
    StoreFailed(String),
}

/// 웹훅 디스패처
pub struct WebhookDispatcher {
    engine: Arc<LifecycleEngine>,
    formats: Vec<Box<dyn WebhookFormat>>,
}

impl WebhookDispatcher {
    /// 형식은 등록 순서대로 판별합니다.
    pub fn new(engine: Arc<LifecycleEngine>, formats: Vec<Box<dyn WebhookFormat>>) -> Self {
        Self { engine, formats }
    }

    /// 원시 본문에서 페이로드를 꺼내 디스패치합니다.
    pub async fn dispatch_body(&self, delivery: &WebhookDelivery<'_>) -> DispatchOutcome {
        match extract_payload(delivery.content_type, delivery.body) {
            Some(payload) => self.dispatch(&payload, delivery).await,
            None => {
                tracing::warn!(
                    content_type = delivery.content_type,
                    len = delivery.body.len(),
                    "Webhook body carried no JSON payload, acknowledging"
                );
                DispatchOutcome::Malformed("no JSON payload".to_string())
            }
        }
    }

    /// 이미 꺼낸 페이로드를 디스패치합니다. 인증에는 `delivery`의 원시 정보를 씁니다.
    pub async fn dispatch(&self, payload: &Value, delivery: &WebhookDelivery<'_>) -> DispatchOutcome {
        let Some(format) = self.formats.iter().find(|f| f.recognizes(payload)) else {
            tracing::warn!("Webhook payload matches no known provider format, acknowledging");
            return DispatchOutcome::Malformed("unrecognized payload shape".to_string());
        };

        if !format.authenticate(payload, delivery) {
            tracing::warn!(format = format.name(), "Webhook failed authentication, discarding");
            return DispatchOutcome::Unauthenticated;
        }

        let event = match format.normalize(payload) {
            Ok(Some(event)) => event,
            Ok(None) => {
                let name = event_name(payload);
                tracing::debug!(format = format.name(), event = %name, "Ignoring webhook event type");
                return DispatchOutcome::IgnoredEvent(name);
            }
            Err(reason) => {
                tracing::warn!(format = format.name(), %reason, "Malformed webhook payload");
                return DispatchOutcome::Malformed(reason);
            }
        };

        let lifecycle_event = LifecycleEvent::from_provider_event(&event);
        match self
            .engine
            .apply_for_request(&event.provider_request_id, lifecycle_event)
            .await
        {
            Ok(Some(session)) => DispatchOutcome::Applied(session.status),
            Ok(None) => DispatchOutcome::UnknownSession,
            Err(e) => {
                tracing::error!(
                    provider_request_id = %event.provider_request_id,
                    error = %e,
                    "Failed to apply webhook event, acknowledging anyway"
                );
                DispatchOutcome::StoreFailed(e.to_string())
            }
        }
    }
}

fn event_name(payload: &Value) -> String {
    payload
        .pointer("/event/event_type")
        .or_else(|| payload.get("event"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// 본문에서 JSON 페이로드를 꺼냅니다.
///
/// form-urlencoded면 `json` 필드를, 그 밖에는 본문 전체를 JSON으로 읽습니다.
/// multipart 본문은 라우트 계층에서 `json` 파트를 꺼낸 뒤 `dispatch`를 호출합니다.
pub fn extract_payload(content_type: Option<&str>, body: &[u8]) -> Option<Value> {
    let is_form = content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        let json = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "json")
            .map(|(_, value)| value.into_owned())?;
        return serde_json::from_str(&json).ok();
    }

    serde_json::from_slice(body).ok().or_else(|| {
        // Content-Type이 빠진 form 본문도 받아 줍니다.
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "json")
            .and_then(|(_, value)| serde_json::from_str(&value).ok())
    })
}
