//! # 비즈니스 로직 모듈
//!
//! - `provider`: 외부 전자서명 제공자 어댑터
//! - `lifecycle`: 세션 상태 기계 (생성, 전이, 멱등성, 종결 상태 보호)
//! - `webhook`: 웹훅 페이로드 정규화와 디스패치
//! - `sync`: 제공자 상태 조회 기반 동기화

pub mod lifecycle;
pub mod provider;
pub mod sync;
pub mod webhook;

pub use lifecycle::{LifecycleEngine, LifecycleEvent};
pub use provider::{DropboxSignClient, SignatureProvider};
pub use sync::sync_session;
pub use webhook::{DocuSignConnectFormat, DropboxSignFormat, WebhookDispatcher};
