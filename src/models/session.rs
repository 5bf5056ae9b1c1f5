//! # 서명 세션 모델 정의
//!
//! 한 명의 서명자가 하나의 서명 요청을 진행하는 과정을 추적하는
//! 데이터 구조체들을 정의합니다.
//!
//! ## 상태 흐름
//! ```text
//! SENT ──┬─▶ COMPLETED  (모든 서명자 서명 완료)
//!        ├─▶ DECLINED   (서명 거절)
//!        └─▶ VOIDED     (요청 취소 / 제공자 오류)
//! ```
//! COMPLETED, DECLINED, VOIDED는 종결(terminal) 상태이며
//! 종결 상태에서 다른 상태로 되돌아가는 전이는 없습니다.

use chrono::{DateTime, Utc}; // DateTime<Utc>: 타임존이 UTC로 고정된 시각
use serde::{Deserialize, Serialize}; // JSON 직렬화/역직렬화 derive 매크로
use std::fmt; // Display 구현용
use std::str::FromStr; // "sent".parse::<SessionStatus>()를 가능하게 하는 트레이트

use super::SignerInfo;

/// 세션의 현재 라이프사이클 상태
///
/// JSON과 DB에는 소문자 문자열("sent", "completed" 등)로 저장됩니다.
// Copy: 작은 값 타입이라 대입 시 move 대신 비트 복사됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")] // Completed → "completed"
pub enum SessionStatus {
    Created,
    Sent,
    Delivered,
    Signed,
    Completed,
    Declined,
    Voided,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 7] = [
        SessionStatus::Created,
        SessionStatus::Sent,
        SessionStatus::Delivered,
        SessionStatus::Signed,
        SessionStatus::Completed,
        SessionStatus::Declined,
        SessionStatus::Voided,
    ];

    /// 종결 상태 여부. 종결 상태의 세션은 어떤 이벤트로도 상태가 바뀌지 않습니다.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Declined | SessionStatus::Voided
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::Sent => "sent",
            SessionStatus::Delivered => "delivered",
            SessionStatus::Signed => "signed",
            SessionStatus::Completed => "completed",
            SessionStatus::Declined => "declined",
            SessionStatus::Voided => "voided",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown session status: {s}"))
    }
}

/// 서명 세션 엔티티
///
/// `session_id`, `provider_request_id`, `provider_signer_ref`, `signer`,
/// `created_at`, `expires_at`, `signing_url`은 생성 후 바뀌지 않습니다.
/// `status`와 종결 메타데이터는 라이프사이클 엔진만 변경합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningSession {
    /// 로컬에서 발급한 세션 식별자 (UUIDv7)
    pub session_id: String,
    /// 제공자 측 서명 요청 식별자. 웹훅 역색인의 키
    pub provider_request_id: String,
    /// 제공자 측 서명 슬롯 식별자. 서명자별 서명 URL 발급에 필요
    pub provider_signer_ref: String,
    pub signer: SignerInfo,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// 서명 URL 유효 기한 (권고용, 엔진은 이 값으로 전이를 막지 않음)
    pub expires_at: DateTime<Utc>,
    pub signing_url: String,

    // ── 종결 메타데이터: 한 번만 설정됩니다 ──
    pub signed_at: Option<DateTime<Utc>>,
    pub documents_available: bool,
    pub declined_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    /// 일부 서명자만 서명했을 때의 진행 표시. status는 바꾸지 않습니다.
    pub last_signature_at: Option<DateTime<Utc>>,
}

impl SigningSession {
    /// 제공자 응답을 받은 직후의 새 세션 (상태 SENT)
    ///
    /// 템플릿 기반 생성은 제공자에게 즉시 발송을 요청하므로
    /// CREATED/DELIVERED 단계를 건너뜁니다.
    pub fn new(
        provider_request_id: String,
        provider_signer_ref: String,
        signer: SignerInfo,
        signing_url: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::now_v7().to_string(),
            provider_request_id,
            provider_signer_ref,
            signer,
            status: SessionStatus::Sent,
            created_at,
            expires_at,
            signing_url,
            signed_at: None,
            documents_available: false,
            declined_at: None,
            decline_reason: None,
            voided_at: None,
            last_signature_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 세션 부분 업데이트
///
/// `Some`인 필드만 덮어씁니다. 불변 필드는 여기에 아예 없으므로
/// 업데이트로 식별자나 서명자 스냅샷이 바뀔 수 없습니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub signed_at: Option<DateTime<Utc>>,
    pub documents_available: Option<bool>,
    pub declined_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub last_signature_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    /// 메모리상의 세션에 업데이트를 적용합니다.
    pub fn apply_to(&self, session: &mut SigningSession) {
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(at) = self.signed_at {
            session.signed_at = Some(at);
        }
        if let Some(available) = self.documents_available {
            session.documents_available = available;
        }
        if let Some(at) = self.declined_at {
            session.declined_at = Some(at);
        }
        if let Some(reason) = &self.decline_reason {
            session.decline_reason = Some(reason.clone());
        }
        if let Some(at) = self.voided_at {
            session.voided_at = Some(at);
        }
        if let Some(at) = self.last_signature_at {
            session.last_signature_at = Some(at);
        }
    }
}

// ── API 요청/응답 ──

/// 세션 생성 응답: `POST /create-signing-session`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub signing_url: String,
    pub session_id: String,
    pub provider_request_id: String,
    pub expires_at: DateTime<Utc>,
    /// 프론트엔드가 임베디드 서명 클라이언트를 초기화할 때 쓰는 client id
    pub provider_client_id: String,
}

/// 상태 조회 응답: `GET /signing-status/{session_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct SigningStatusResponse {
    pub session_id: String,
    pub provider_request_id: String,
    pub status: SessionStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub documents_available: bool,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

impl SigningStatusResponse {
    pub fn from_session(session: SigningSession, now: DateTime<Utc>) -> Self {
        let expired = session.is_expired(now);
        Self {
            session_id: session.session_id,
            provider_request_id: session.provider_request_id,
            status: session.status,
            signed_at: session.signed_at,
            declined_at: session.declined_at,
            decline_reason: session.decline_reason,
            documents_available: session.documents_available,
            expires_at: session.expires_at,
            expired,
        }
    }
}

/// 동기화 응답: `POST /sync-status/{session_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    pub session_id: String,
    pub provider_request_id: String,
    pub status: SessionStatus,
    pub last_sync: DateTime<Utc>,
}

/// 강제 완료 응답: `POST /force-completion/{session_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ForceCompletionResponse {
    pub status: SessionStatus,
    pub session_id: String,
}
