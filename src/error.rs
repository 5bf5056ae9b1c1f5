//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 에러는 세 계층으로 나뉩니다:
//! - `ProviderError`: 외부 전자서명 제공자 호출 실패 (거부 / 연결 불가 / 문서 미준비)
//! - `StoreError`: 세션 저장소 실패 (중복 / 미존재 / DB 오류)
//! - `AppError`: HTTP 경계에서 쓰는 통합 에러. `IntoResponse`로 응답 변환
//!
//! 외부 응답은 일반적인 메시지로 뭉뚱그리지만, 내부 로그에는
//! 원래의 에러 종류를 그대로 남깁니다.

use axum::{
    http::StatusCode,                   // HTTP 상태 코드 (400, 404, 500 등)
    response::{IntoResponse, Response}, // 핸들러 반환값을 HTTP 응답으로 바꾸는 트레이트
    Json,                               // JSON 응답 래퍼
};
use serde_json::json; // json! 매크로: JSON 값을 리터럴처럼 작성
use thiserror::Error; // #[derive(Error)]로 std::error::Error + Display 자동 구현

// 세 에러 타입 모두 #[derive(Debug, Error)]를 씁니다.
// #[error("...")] 어트리뷰트가 각 variant의 Display 메시지가 되고,
// {0}은 variant의 첫 번째 필드를 가리킵니다.

/// 전자서명 제공자 호출에서 발생하는 에러
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 제공자가 애플리케이션 수준 에러 봉투(`{"error": {...}}`)를 돌려줌.
    /// HTTP 200이어도 본문에 에러 객체가 있으면 이 variant가 됩니다.
    #[error("Provider rejected request: {0}")]
    Rejected(String),

    /// 전송 계층 실패, 타임아웃, 에러 봉투 없는 비정상 상태 코드
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// 완료된 문서가 아직 없음
    #[error("Signed document is not ready")]
    DocumentNotReady,
}

// reqwest 에러(연결 실패, 타임아웃, 본문 디코딩 실패)는 모두 연결 불가로 취급합니다.
// From 트레이트를 구현하면 reqwest 호출 뒤의 `?`가 이 변환을 자동으로 호출합니다.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Unavailable(format!("request timed out: {err}"))
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

/// 세션 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    /// 같은 session_id(또는 provider_request_id)가 이미 존재
    #[error("Duplicate session: {0}")]
    DuplicateSession(String),

    /// 해당 session_id가 없음
    #[error("Session not found: {0}")]
    NotFound(String),

    /// 영속 저장소(SQLite) 오류
    /// #[from]: sqlx::Error → StoreError::Database 변환(From)을 자동 생성
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 저장된 행을 도메인 타입으로 되돌릴 수 없음 (알 수 없는 status 문자열 등)
    #[error("Corrupt session record: {0}")]
    Corrupt(String),
}

/// HTTP 경계의 통합 에러
///
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 세션을 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 제공자 호출 실패
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// 저장소 실패
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 제공자/저장소 에러는 실제 원인을 `error!`로 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Store(StoreError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Resource not found".to_string(),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Provider(ProviderError::DocumentNotReady) => (
                StatusCode::BAD_REQUEST,
                "not_ready",
                "Document not yet signed".to_string(),
            ),
            AppError::Provider(ref e) => {
                tracing::error!(error = ?e, "Provider error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "provider_error",
                    "The signature provider request failed".to_string(),
                )
            }
            AppError::Store(ref e) => {
                tracing::error!(error = ?e, "Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "A storage error occurred".to_string(),
                )
            }
        };

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
