//! # signflow 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 세션 저장소 선택 (DATABASE_URL이 있으면 SQLite, 없으면 메모리)
//! 4. 제공자 클라이언트 생성
//! 5. 라우터 조립 후 HTTP 서버 시작

use std::sync::Arc;

use anyhow::Result; // anyhow::Result: 어떤 에러 타입이든 담는 범용 Result
// 라이브러리 크레이트(src/lib.rs)의 공개 항목을 크레이트 이름으로 가져옵니다.
use signflow::{
    build_router,
    config::Config,
    db::{MemorySessionStore, SessionStore, SqliteSessionStore},
    routes::AppState,
    services::{DropboxSignClient, SignatureProvider},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // .with() / .init() 확장 메서드

// #[tokio::main]: main을 tokio 런타임 안에서 실행하도록 감싸는 어트리뷰트 매크로
#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // RUST_LOG가 없으면 signflow, tower_http, axum을 debug 레벨로 출력
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signflow=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // `?`: VarError를 anyhow::Error로 바꿔 즉시 반환 (필수 변수가 없으면 시작 실패)
    let config = Config::from_env()?;
    tracing::info!("Starting signflow server on {}:{}", config.host, config.port);

    // ── 세션 저장소 ──
    // 메모리 저장소는 재시작하면 모든 세션을 잃습니다.
    // match는 표현식이므로 각 갈래의 값이 곧 store가 됩니다.
    // 두 구현 모두 Arc<dyn SessionStore>로 강제 변환(coercion)됩니다.
    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Using SQLite session store");
            Arc::new(SqliteSessionStore::connect(url).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, sessions are kept in memory only");
            Arc::new(MemorySessionStore::new())
        }
    };

    // ── 제공자 클라이언트 ──
    if config.provider.test_mode {
        tracing::info!("Signature requests are created in test mode");
    }
    if !config.provider.verify_events {
        tracing::warn!("Webhook event_hash verification is disabled");
    }
    let provider: Arc<dyn SignatureProvider> =
        Arc::new(DropboxSignClient::new(config.provider.clone())?);

    let state = AppState::new(
        store,
        provider,
        &config.provider,
        config.signing_url_ttl_minutes,
    );
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // 이 줄에서 서버가 종료될 때까지 요청을 처리합니다.
    axum::serve(listener, app).await?;

    Ok(())
}
