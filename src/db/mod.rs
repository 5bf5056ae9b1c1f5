//! # 세션 저장소 계층 (Session Store)
//!
//! 세션 ID → 세션 레코드 기본 맵과, 제공자 요청 ID → 세션 ID 역색인을 소유합니다.
//! 비즈니스 로직은 없고 저장과 조회만 담당합니다.
//!
//! 구현체:
//! - `memory`: 프로세스 메모리 (기본값, 재시작 시 소실)
//! - `sqlite`: sqlx 기반 SQLite 영속 저장소 (`DATABASE_URL`이 있을 때)
//!
//! 같은 세션에 대한 읽기-수정-쓰기 순서는 라이프사이클 엔진이 보장합니다.
//! 저장소는 개별 호출의 원자성만 책임집니다.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{SessionUpdate, SigningSession};

/// 세션 저장소 인터페이스
///
/// `Arc<dyn SessionStore>`로 주입되므로 `async_trait`을 사용합니다.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 새 세션을 넣습니다.
    ///
    /// `session_id` 또는 `provider_request_id`가 이미 있으면 `DuplicateSession`.
    /// 역색인이 항상 전단사(bijection)가 되도록 두 키를 함께 검사합니다.
    async fn put(&self, session: SigningSession) -> Result<(), StoreError>;

    async fn get(&self, session_id: &str) -> Result<Option<SigningSession>, StoreError>;

    /// 제공자 요청 ID로 세션 ID를 찾습니다.
    async fn index_by_request_id(
        &self,
        provider_request_id: &str,
    ) -> Result<Option<String>, StoreError>;

    /// 부분 업데이트를 적용하고 갱신된 세션을 돌려줍니다. 없으면 `NotFound`.
    ///
    /// 역색인은 불변 필드인 `provider_request_id`를 키로 하므로 건드리지 않습니다.
    async fn update(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<SigningSession, StoreError>;
}
