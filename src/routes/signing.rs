//! # 서명 세션 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | POST | /create-signing-session | `create_signing_session` | 서명 요청 생성 + 세션 기록 |
//! | GET | /signing-status/{session_id} | `get_signing_status` | 저장된 상태 조회 |
//! | GET | /download-document/{session_id} | `download_signed_document` | 완료 문서 PDF |
//! | POST | /sync-status/{session_id} | `sync_signing_status` | 제공자에 직접 물어 동기화 |
//! | POST | /force-completion/{session_id} | `force_completion` | 프론트엔드 감지 완료 |
//!
//! ## 사용 흐름
//! ```text
//! 1. 서명자 정보 입력 → POST /create-signing-session (signing_url 수신)
//! 2. 임베디드 서명 진행, 주기적으로 GET /signing-status/{id}
//! 3. 웹훅이 늦으면 → POST /sync-status/{id}
//! 4. COMPLETED → GET /download-document/{id}
//! ```

use axum::{
    extract::{Path, State},             // Path: URL 경로 파라미터, State: 공유 상태 추출기
    http::header,                       // 표준 헤더 이름 상수 (CONTENT_TYPE 등)
    response::{IntoResponse, Response}, // 튜플/바이트를 HTTP 응답으로 변환
    Json,                               // 요청 본문 역직렬화 + 응답 직렬화
};
use chrono::Utc;

use crate::{
    error::{AppError, ProviderError, StoreError},
    models::*, // SigningSession, SessionStatus, 응답 DTO 등 (glob import)
    routes::AppState,
    services::{sync_session, LifecycleEvent},
};

/// 새 서명 세션을 만듭니다.
///
/// `POST /create-signing-session`
/// + `{ "email": "a@x.com", "name": "Ann", "role": "signer", "phone": null }`
///
/// 제공자가 요청 생성과 서명 URL 발급을 모두 성공한 뒤에만 세션을 저장합니다.
/// 실패한 생성은 세션 레코드를 남기지 않습니다.
pub async fn create_signing_session(
    State(state): State<AppState>,
    Json(req): Json<SignerInfo>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    // map_err(AppError::BadRequest): String 에러를 AppError로 감쌉니다.
    // enum variant 이름은 그대로 함수처럼 넘길 수 있습니다.
    let signer = req.validate().map_err(AppError::BadRequest)?;

    let created = state
        .provider
        .create_signature_request(&signer, &state.template_id)
        .await?;
    tracing::debug!(raw = %created.raw_response, "Provider accepted signature request");

    let signing_url = state
        .provider
        .get_signing_url(&created.provider_signer_ref)
        .await?;

    let created_at = Utc::now();
    let session = state
        .engine
        .create_session(SigningSession::new(
            created.provider_request_id,
            created.provider_signer_ref,
            signer,
            signing_url,
            created_at,
            created_at + state.signing_url_ttl,
        ))
        .await?;

    Ok(Json(CreateSessionResponse {
        signing_url: session.signing_url,
        session_id: session.session_id,
        provider_request_id: session.provider_request_id,
        expires_at: session.expires_at,
        provider_client_id: state.provider.client_id().to_string(),
    }))
}

/// 저장된 세션 상태를 조회합니다. 제공자는 호출하지 않습니다.
///
/// `GET /signing-status/{session_id}`
pub async fn get_signing_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SigningStatusResponse>, AppError> {
    let session = state
        .engine
        .store()
        .get(&session_id)
        .await? // StoreError → AppError (From 자동 변환)
        .ok_or(AppError::NotFound)?; // Option::None → Err(NotFound)

    Ok(Json(SigningStatusResponse::from_session(session, Utc::now())))
}

/// 완료된 문서를 PDF로 내려줍니다.
///
/// `GET /download-document/{session_id}`
///
/// 상태가 COMPLETED가 아니면 400. 읽기 전용이므로 여러 번 호출해도 됩니다.
pub async fn download_signed_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let session = state
        .engine
        .store()
        .get(&session_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if session.status != SessionStatus::Completed {
        return Err(ProviderError::DocumentNotReady.into());
    }

    let bytes = state
        .provider
        .download_document(&session.provider_request_id)
        .await?;

    let disposition = format!("attachment; filename=\"signed_document_{session_id}.pdf\"");
    // (헤더 배열, 본문) 튜플은 그 자체로 IntoResponse를 구현합니다.
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// 제공자 상태를 직접 조회해 세션을 맞춥니다.
///
/// `POST /sync-status/{session_id}`
pub async fn sync_signing_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SyncStatusResponse>, AppError> {
    // .as_ref(): &Arc<dyn SignatureProvider> → &dyn SignatureProvider
    let outcome = sync_session(&state.engine, state.provider.as_ref(), &session_id).await?;

    Ok(Json(SyncStatusResponse {
        session_id: outcome.session.session_id,
        provider_request_id: outcome.session.provider_request_id,
        status: outcome.session.status,
        last_sync: outcome.last_sync,
    }))
}

/// 프론트엔드가 완료를 감지했을 때 제공자 확인 없이 세션을 COMPLETED로 만듭니다.
///
/// `POST /force-completion/{session_id}`
///
/// 이미 종결된 세션(DECLINED, VOIDED)은 바뀌지 않으며, 응답에는 실제 상태가 실립니다.
pub async fn force_completion(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ForceCompletionResponse>, AppError> {
    let session = state
        .engine
        .apply(&session_id, LifecycleEvent::ForceComplete)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => AppError::NotFound,
            other => AppError::Store(other),
        })?;

    if session.status != SessionStatus::Completed {
        tracing::warn!(
            session_id = %session.session_id,
            status = %session.status,
            "Force completion ignored for terminal session"
        );
    }

    Ok(Json(ForceCompletionResponse {
        status: session.status,
        session_id: session.session_id,
    }))
}
