//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `signing`: 서명 세션 생성/조회/다운로드/동기화/강제 완료
//! - `webhook`: 제공자 웹훅 수신

pub mod health;
pub mod signing;
pub mod webhook;

pub use health::*;
pub use signing::*;
pub use webhook::*;

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::db::SessionStore;
use crate::services::webhook::WebhookFormat;
use crate::services::{
    DocuSignConnectFormat, DropboxSignFormat, LifecycleEngine, SignatureProvider,
    WebhookDispatcher,
};

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 필드는 전부 `Arc`이거나 작은 값이라 clone 비용이 작습니다.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub provider: Arc<dyn SignatureProvider>,
    pub dispatcher: Arc<WebhookDispatcher>,
    /// 서명 요청에 쓰는 템플릿
    pub template_id: String,
    /// 세션 생성 시각부터 서명 URL 유효 기한까지의 길이
    pub signing_url_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn SignatureProvider>,
        provider_config: &ProviderConfig,
        signing_url_ttl_minutes: i64,
    ) -> Self {
        let engine = Arc::new(LifecycleEngine::new(store));

        // Vec<Box<dyn Trait>>: 서로 다른 타입의 형식을 한 목록에 담는 트레이트 객체
        let mut formats: Vec<Box<dyn WebhookFormat>> = vec![Box::new(DropboxSignFormat::new(
            provider_config.api_key.clone(),
            provider_config.verify_events,
        ))];
        // Connect 형식은 검증 키가 있을 때만 받습니다.
        if let Some(key) = &provider_config.docusign_connect_key {
            formats.push(Box::new(DocuSignConnectFormat::new(key.clone())));
        }
        let dispatcher = Arc::new(WebhookDispatcher::new(engine.clone(), formats));

        Self {
            engine,
            provider,
            dispatcher,
            template_id: provider_config.template_id.clone(),
            signing_url_ttl: chrono::Duration::minutes(signing_url_ttl_minutes),
        }
    }
}
