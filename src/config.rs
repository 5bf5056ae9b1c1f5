//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DROPBOX_SIGN_API_KEY`: 제공자 API 키 (필수, 웹훅 event_hash 검증 키로도 사용)
//! - `DROPBOX_SIGN_CLIENT_ID`: 임베디드 서명 앱의 client id (필수)
//! - `DROPBOX_SIGN_TEMPLATE_ID`: 서명에 사용할 템플릿 (필수)
//! - `DROPBOX_SIGN_API_BASE_URL`: API 기본 주소
//! - `DROPBOX_SIGN_TEST_MODE`: 테스트 모드 서명 요청 여부
//! - `DROPBOX_SIGN_VERIFY_EVENTS`: 웹훅 event_hash 검증 여부
//! - `DOCUSIGN_CONNECT_HMAC_KEY`: 있으면 DocuSign Connect 웹훅을 받고 이 키로 서명 검증
//! - `PROVIDER_TIMEOUT_SECS`: 제공자 호출 타임아웃
//! - `SIGNING_URL_TTL_MINUTES`: 서명 URL 유효 시간 (expires_at 계산)
//! - `DATABASE_URL`: 있으면 SQLite 저장소, 없으면 메모리 저장소
//! - `HOST` / `PORT`: 서버 바인딩 주소

use std::env; // 환경변수 읽기 (env::var)
use std::time::Duration; // 시간 간격 타입

/// 전자서명 제공자 연결 설정
///
/// `DropboxSignClient`와 웹훅 검증기가 공유합니다.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub client_id: String,
    pub template_id: String,
    pub api_base_url: String,
    pub test_mode: bool,
    pub verify_events: bool,
    /// DocuSign Connect HMAC 키. None이면 Connect 형식 웹훅은 인식하지 않습니다.
    pub docusign_connect_key: Option<String>,
    /// 모든 제공자 호출에 걸리는 상한 시간. 초과하면 `ProviderError::Unavailable`
    pub timeout: Duration,
}

/// 애플리케이션 전체 설정을 담는 구조체
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    /// 세션 생성 시각부터 서명 URL이 유효한 시간 (분)
    pub signing_url_ttl_minutes: i64,
    /// SQLite 데이터베이스 URL (예: "sqlite:data/signflow.db?mode=rwc")
    /// None이면 프로세스 메모리에만 세션을 보관합니다.
    pub database_url: Option<String>,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 8000)
    pub port: u16,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// API 키, client id, 템플릿 id는 필수이며, 없으면 `VarError`가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            provider: ProviderConfig {
                api_key: env::var("DROPBOX_SIGN_API_KEY")?,
                client_id: env::var("DROPBOX_SIGN_CLIENT_ID")?,
                template_id: env::var("DROPBOX_SIGN_TEMPLATE_ID")?,
                api_base_url: env::var("DROPBOX_SIGN_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.hellosign.com/v3".to_string()),
                test_mode: flag("DROPBOX_SIGN_TEST_MODE", true),
                verify_events: flag("DROPBOX_SIGN_VERIFY_EVENTS", true),
                docusign_connect_key: env::var("DOCUSIGN_CONNECT_HMAC_KEY")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
                timeout: Duration::from_secs(
                    env::var("PROVIDER_TIMEOUT_SECS")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(30),
                ),
            },
            signing_url_ttl_minutes: env::var("SIGNING_URL_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            // .ok(): Result → Option. 변수가 없으면 None
            // 빈 문자열은 "설정 안 함"으로 취급
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
        })
    }
}

/// "true"/"1"/"yes"(대소문자 무시)를 참으로 읽습니다. 변수가 없으면 `default`.
fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => parse_flag(&value),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
