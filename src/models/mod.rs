//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다:
//! - `event`: 제공자 웹훅 이벤트의 정규화된 형태
//! - `session`: 서명 세션, 상태, 부분 업데이트, API 응답
//! - `signer`: 서명자 신원과 경계 검증
//!
//! `pub use X::*;`로 재공개하여 `crate::models::SigningSession`처럼 짧게 접근합니다.

pub mod event;
pub mod session;
pub mod signer;

pub use event::*;
pub use session::*;
pub use signer::*;
