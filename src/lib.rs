//! # signflow
//!
//! 임베디드 전자서명 세션을 만들고, 제공자 웹훅과 상태 조회를 이용해
//! 세션 상태를 제공자와 맞춰 두는 서버입니다.
//!
//! 구성:
//! - `db`: 세션 저장소 (메모리 / SQLite)
//! - `services`: 제공자 어댑터, 상태 기계, 웹훅 디스패처, 동기화
//! - `routes`: HTTP 핸들러와 공유 상태

// `pub mod`: 모듈을 선언하고 크레이트 밖(main.rs, tests/)에도 공개합니다.
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use axum::{
    routing::{get, post}, // HTTP 메서드별 라우팅 함수
    Router,               // URL 경로와 핸들러를 연결하는 라우터
};
use tower_http::{
    cors::{Any, CorsLayer}, // 교차 출처 요청 허용
    trace::TraceLayer,      // 요청/응답 자동 로깅 미들웨어
};

use routes::*; // 핸들러 함수들과 AppState

/// 전체 HTTP 라우터를 조립합니다.
///
/// 경로 파라미터는 axum 0.8 문법(`{session_id}`)을 씁니다.
pub fn build_router(state: AppState) -> Router {
    // 임베디드 서명 프론트엔드가 다른 출처에서 호출합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/create-signing-session", post(create_signing_session))
        .route("/signing-status/{session_id}", get(get_signing_status))
        .route("/download-document/{session_id}", get(download_signed_document))
        .route("/webhook", post(provider_callback))
        .route("/sync-status/{session_id}", post(sync_signing_status))
        .route("/force-completion/{session_id}", post(force_completion))
        .route("/health", get(health_check))
        // .with_state(): 모든 핸들러가 State<AppState>로 같은 상태를 받습니다.
        .with_state(state)
        // .layer(): 라우터 전체를 감싸는 미들웨어. 나중에 추가한 레이어가 바깥쪽입니다.
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
