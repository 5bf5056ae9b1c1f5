use std::collections::HashMap; // 키-값 해시 맵
use std::sync::{PoisonError, RwLock}; // RwLock: 읽기는 여럿이 동시에, 쓰기는 한 번에 하나만

use async_trait::async_trait; // 트레이트 안의 async fn을 dyn 호환 형태로 바꿔주는 매크로

use super::SessionStore; // super: 부모 모듈(db)
use crate::error::StoreError;
use crate::models::{SessionUpdate, SigningSession};

#[derive(Debug, Default)]
struct Maps {
    sessions: HashMap<String, SigningSession>,
    by_request_id: HashMap<String, String>,
}

/// 프로세스 메모리 세션 저장소
///
/// 기본 맵과 역색인을 하나의 `RwLock` 아래 두어 두 맵이 항상 함께 바뀝니다.
/// 락은 await 지점을 넘어 잡지 않으므로 `std::sync`로 충분합니다.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    maps: RwLock<Maps>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: SigningSession) -> Result<(), StoreError> {
        // 다른 스레드가 락을 잡은 채 패닉하면 락이 "오염(poisoned)"됩니다.
        // into_inner로 오염 표시를 무시하고 안의 데이터를 그대로 씁니다.
        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);

        if maps.sessions.contains_key(&session.session_id) {
            return Err(StoreError::DuplicateSession(session.session_id));
        }
        if maps.by_request_id.contains_key(&session.provider_request_id) {
            return Err(StoreError::DuplicateSession(format!(
                "provider request {} already has a session",
                session.provider_request_id
            )));
        }

        maps.by_request_id.insert(
            session.provider_request_id.clone(),
            session.session_id.clone(),
        );
        maps.sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SigningSession>, StoreError> {
        let maps = self.maps.read().unwrap_or_else(PoisonError::into_inner);
        // .cloned(): Option<&T> → Option<T>. 락 밖으로 참조를 내보낼 수 없으므로 복제합니다.
        Ok(maps.sessions.get(session_id).cloned())
    }

    async fn index_by_request_id(
        &self,
        provider_request_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let maps = self.maps.read().unwrap_or_else(PoisonError::into_inner);
        Ok(maps.by_request_id.get(provider_request_id).cloned())
    }

    async fn update(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<SigningSession, StoreError> {
        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);
        let session = maps
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        update.apply_to(session); // get_mut으로 얻은 &mut 참조를 제자리에서 수정
        Ok(session.clone())
    }
}
