//! # 동기화(Reconciliation) 경로
//!
//! 웹훅이 늦거나 유실되었을 때 쓰는 대체 경로입니다.
//! 제공자에게 현재 상태를 직접 묻고, 결과를 웹훅과 같은 전이 규칙으로 적용합니다.
//! 언제, 몇 번을 호출해도 멱등 전이 외의 부작용은 없습니다.

use chrono::{DateTime, Utc};

use crate::error::{AppError, StoreError};
use crate::models::SigningSession;
use crate::services::lifecycle::{LifecycleEngine, LifecycleEvent};
use crate::services::provider::SignatureProvider;

/// 동기화 결과: 새로 계산된 세션과 동기화 시각
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub session: SigningSession,
    pub last_sync: DateTime<Utc>,
}

/// 세션 하나를 제공자 상태와 맞춥니다.
///
/// # 에러
/// - 세션이 없으면 `AppError::NotFound`
/// - 제공자 호출 실패는 그대로 `AppError::Provider`로 전파 (호출자가 실패를 알아야 함)
pub async fn sync_session(
    engine: &LifecycleEngine,
    provider: &dyn SignatureProvider,
    session_id: &str,
) -> Result<SyncOutcome, AppError> {
    let session = engine
        .store()
        .get(session_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = provider.get_status(&session.provider_request_id).await?;
    tracing::debug!(session_id, ?status, "Fetched provider status");

    let event = LifecycleEvent::from_provider_status(status);
    let session = engine.apply(session_id, event).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound,
        other => AppError::Store(other),
    })?;

    Ok(SyncOutcome {
        session,
        last_sync: Utc::now(),
    })
}
