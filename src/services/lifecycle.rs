//! # 라이프사이클 엔진: 서명 세션 상태 기계
//!
//! 세션 생성과 상태 전이를 담당합니다. 웹훅 경로와 동기화(sync) 경로가
//! 모두 같은 전이 규칙(`plan`)을 통과하므로, 어느 채널이 먼저 도착하든
//! 결과가 같습니다.
//!
//! ## 전이 규칙
//! | 이벤트 | 결과 상태 | 함께 설정되는 필드 |
//! |--------|-----------|--------------------|
//! | AllSigned / SyncComplete / ForceComplete | COMPLETED | signed_at(비어 있을 때), documents_available |
//! | SignerSigned | 변경 없음 | last_signature_at |
//! | Declined | DECLINED | declined_at, decline_reason |
//! | SyncDeclined | DECLINED | declined_at |
//! | Canceled / SyncErrored | VOIDED | voided_at |
//! | SyncPending | SENT | - |
//!
//! 종결 상태(COMPLETED, DECLINED, VOIDED)의 세션에는 어떤 이벤트도 적용되지 않습니다.
//! 같은 이벤트를 두 번 받아도 두 번째는 조용한 no-op입니다.

use std::sync::Arc; // Arc: 여러 소유자가 공유하는 스레드 안전 참조 카운트 포인터

use chrono::{DateTime, Utc};
use tokio::sync::Mutex; // tokio의 Mutex: 잡은 채로 .await 해도 되는 비동기 락

use crate::db::SessionStore;
use crate::error::StoreError;
use crate::models::{EventKind, ProviderEvent, SessionStatus, SessionUpdate, SigningSession};
use crate::services::provider::ProviderStatus;

const NO_REASON: &str = "No reason provided";

/// 엔진이 받는 전이 이벤트
///
/// `Sync*` 변형은 제공자 상태 조회 결과에서, 나머지는 웹훅에서 옵니다.
/// `ForceComplete`는 프론트엔드가 완료를 감지했을 때의 탈출구입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    AllSigned,
    SignerSigned,
    Declined { reason: Option<String> },
    Canceled,
    SyncComplete,
    SyncDeclined,
    SyncErrored,
    SyncPending,
    ForceComplete,
}

impl LifecycleEvent {
    pub fn from_provider_event(event: &ProviderEvent) -> Self {
        match event.kind {
            EventKind::AllSigned => LifecycleEvent::AllSigned,
            EventKind::SignerSigned => LifecycleEvent::SignerSigned,
            EventKind::Declined => LifecycleEvent::Declined {
                reason: event.decline_reason.clone(),
            },
            EventKind::Canceled => LifecycleEvent::Canceled,
        }
    }

    /// 세 플래그의 우선순위: 완료 > 거절 > 오류 > 진행 중
    pub fn from_provider_status(status: ProviderStatus) -> Self {
        if status.complete {
            LifecycleEvent::SyncComplete
        } else if status.declined {
            LifecycleEvent::SyncDeclined
        } else if status.errored {
            LifecycleEvent::SyncErrored
        } else {
            LifecycleEvent::SyncPending
        }
    }
}

/// 현재 세션과 이벤트로부터 적용할 업데이트를 계산합니다.
///
/// `None`이면 no-op입니다 (종결 상태, 이미 같은 상태, 또는 바꿀 것이 없음).
/// 저장소를 건드리지 않는 순수 함수입니다.
pub fn plan(
    session: &SigningSession,
    event: &LifecycleEvent,
    now: DateTime<Utc>,
) -> Option<SessionUpdate> {
    if session.status.is_terminal() {
        return None;
    }

    let update = match event {
        LifecycleEvent::AllSigned | LifecycleEvent::SyncComplete | LifecycleEvent::ForceComplete => {
            SessionUpdate {
                status: Some(SessionStatus::Completed),
                signed_at: session.signed_at.is_none().then_some(now),
                documents_available: Some(true),
                ..Default::default()
            }
        }
        LifecycleEvent::SignerSigned => SessionUpdate {
            last_signature_at: Some(now),
            ..Default::default()
        },
        LifecycleEvent::Declined { reason } => SessionUpdate {
            status: Some(SessionStatus::Declined),
            declined_at: Some(now),
            decline_reason: Some(
                reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(NO_REASON)
                    .to_string(),
            ),
            ..Default::default()
        },
        // 조회 API에는 사유가 없으므로 decline_reason은 건드리지 않습니다.
        LifecycleEvent::SyncDeclined => SessionUpdate {
            status: Some(SessionStatus::Declined),
            declined_at: Some(now),
            ..Default::default()
        },
        LifecycleEvent::Canceled | LifecycleEvent::SyncErrored => SessionUpdate {
            status: Some(SessionStatus::Voided),
            voided_at: Some(now),
            ..Default::default()
        },
        LifecycleEvent::SyncPending => {
            if session.status == SessionStatus::Sent {
                return None;
            }
            SessionUpdate {
                status: Some(SessionStatus::Sent),
                ..Default::default()
            }
        }
    };

    Some(update)
}

/// 라이프사이클 엔진
///
/// 모든 전이는 `transition_lock`을 잡은 채 읽기 → 계산 → 쓰기를 수행합니다.
/// 멀티스레드 런타임에서 웹훅과 sync가 같은 세션을 동시에 건드려도
/// 한쪽의 업데이트가 사라지지 않습니다.
pub struct LifecycleEngine {
    // dyn SessionStore: 메모리/SQLite 어느 구현이든 담을 수 있는 트레이트 객체
    store: Arc<dyn SessionStore>,
    // 보호할 데이터 없이 임계 구역만 만드는 Mutex<()>
    transition_lock: Mutex<()>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            transition_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// 제공자가 요청을 확인한 뒤 새 세션(SENT)을 기록합니다.
    pub async fn create_session(&self, session: SigningSession) -> Result<SigningSession, StoreError> {
        debug_assert_eq!(session.status, SessionStatus::Sent);
        self.store.put(session.clone()).await?;
        tracing::info!(
            session_id = %session.session_id,
            provider_request_id = %session.provider_request_id,
            "Created signing session"
        );
        Ok(session)
    }

    /// 세션 ID로 이벤트를 적용하고 최신 세션을 돌려줍니다.
    ///
    /// 세션이 없으면 `StoreError::NotFound`. no-op이어도 에러가 아니며
    /// 현재 세션을 그대로 돌려줍니다.
    pub async fn apply(
        &self,
        session_id: &str,
        event: LifecycleEvent,
    ) -> Result<SigningSession, StoreError> {
        // _guard가 스코프를 벗어날 때(함수 끝) 락이 자동으로 풀립니다 (RAII).
        let _guard = self.transition_lock.lock().await;

        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;

        match plan(&session, &event, Utc::now()) {
            Some(update) => {
                let updated = self.store.update(session_id, &update).await?;
                tracing::info!(
                    session_id,
                    event = ?event,
                    from = %session.status,
                    to = %updated.status,
                    "Applied session transition"
                );
                Ok(updated)
            }
            None => {
                tracing::debug!(
                    session_id,
                    event = ?event,
                    status = %session.status,
                    "Transition is a no-op"
                );
                Ok(session)
            }
        }
    }

    /// 제공자 요청 ID로 이벤트를 적용합니다.
    ///
    /// 색인된 세션이 없으면 에러가 아니라 `Ok(None)`이며, 경고 로그만 남깁니다.
    pub async fn apply_for_request(
        &self,
        provider_request_id: &str,
        event: LifecycleEvent,
    ) -> Result<Option<SigningSession>, StoreError> {
        let Some(session_id) = self.store.index_by_request_id(provider_request_id).await? else {
            tracing::warn!(
                provider_request_id,
                event = ?event,
                "Received event for unknown signature request, discarding"
            );
            return Ok(None);
        };

        match self.apply(&session_id, event).await {
            Ok(session) => Ok(Some(session)),
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(provider_request_id, %session_id, "Indexed session vanished, discarding");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
