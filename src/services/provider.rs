//! # 전자서명 제공자 어댑터
//!
//! 외부 전자서명 제공자 API 호출을 감쌉니다. 상태를 갖지 않으며,
//! 로컬 서명자 데이터를 제공자 호출 형태로, 제공자 응답을 평범한 값으로 바꿉니다.
//!
//! ## 제공하는 연산
//! - `create_signature_request`: 템플릿 기반 임베디드 서명 요청 생성
//! - `get_signing_url`: 서명자별 임베디드 서명 URL 발급
//! - `get_status`: 완료/거절/오류 세 가지 플래그 조회
//! - `download_document`: 완료된 PDF 바이트 다운로드
//!
//! 일부 제공자는 HTTP 200과 함께 본문에 에러 객체를 돌려주므로,
//! 상태 코드만이 아니라 응답 본문의 `error` 키를 검사합니다.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::models::SignerInfo;

/// 서명 요청 생성 결과
#[derive(Debug, Clone)]
pub struct CreatedRequest {
    pub provider_request_id: String,
    pub provider_signer_ref: String,
    /// 제공자 원본 응답 (디버그 로그용)
    pub raw_response: Value,
}

/// 제공자가 보고한 서명 요청 상태 플래그
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderStatus {
    pub complete: bool,
    pub declined: bool,
    pub errored: bool,
}

/// 전자서명 제공자 인터페이스
///
/// 라우트와 동기화 경로는 `Arc<dyn SignatureProvider>`만 알고,
/// 실제 구현(`DropboxSignClient`)이나 테스트용 스텁은 주입됩니다.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// 프론트엔드의 임베디드 서명 클라이언트가 쓰는 client id
    fn client_id(&self) -> &str;

    async fn create_signature_request(
        &self,
        signer: &SignerInfo,
        template_ref: &str,
    ) -> Result<CreatedRequest, ProviderError>;

    async fn get_signing_url(&self, provider_signer_ref: &str) -> Result<String, ProviderError>;

    async fn get_status(&self, provider_request_id: &str) -> Result<ProviderStatus, ProviderError>;

    async fn download_document(&self, provider_request_id: &str) -> Result<Bytes, ProviderError>;
}

/// Dropbox Sign (구 HelloSign) v3 API 클라이언트
pub struct DropboxSignClient {
    client: Client,
    config: ProviderConfig,
}

impl DropboxSignClient {
    /// 모든 호출에 `config.timeout`이 걸린 HTTP 클라이언트를 만듭니다.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    // API 키를 사용자 이름, 빈 비밀번호로 쓰는 HTTP Basic 인증
    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .basic_auth(&self.config.api_key, None::<&str>)
    }
}

#[async_trait]
impl SignatureProvider for DropboxSignClient {
    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    async fn create_signature_request(
        &self,
        signer: &SignerInfo,
        template_ref: &str,
    ) -> Result<CreatedRequest, ProviderError> {
        let role = &signer.role;
        let custom_fields = json!([
            { "name": "name", "value": signer.name },
            { "name": "phone", "value": signer.phone.as_deref().unwrap_or("") },
            { "name": "email", "value": signer.email },
        ]);

        let form: Vec<(String, String)> = vec![
            ("client_id".to_string(), self.config.client_id.clone()),
            ("template_ids[0]".to_string(), template_ref.to_string()),
            (format!("signers[{role}][name]"), signer.name.clone()),
            (format!("signers[{role}][email_address]"), signer.email.clone()),
            (
                "test_mode".to_string(),
                if self.config.test_mode { "1" } else { "0" }.to_string(),
            ),
            ("custom_fields".to_string(), custom_fields.to_string()),
        ];

        tracing::debug!(template_ref, role = %role, "Creating embedded signature request");

        let response = self
            .client
            .post(self.url("/signature_request/create_embedded_with_template"))
            .basic_auth(&self.config.api_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        let body = read_json(response).await?;

        let request = body
            .get("signature_request")
            .ok_or_else(|| malformed("missing signature_request"))?;
        let provider_request_id = request
            .get("signature_request_id")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing signature_request_id"))?
            .to_string();
        let provider_signer_ref = signature_id_for(request, &signer.email)
            .ok_or_else(|| malformed("missing signature_id"))?;

        Ok(CreatedRequest {
            provider_request_id,
            provider_signer_ref,
            raw_response: body,
        })
    }

    async fn get_signing_url(&self, provider_signer_ref: &str) -> Result<String, ProviderError> {
        let response = self
            .get(&format!("/embedded/sign_url/{provider_signer_ref}"))
            .send()
            .await?;
        let body = read_json(response).await?;

        body.pointer("/embedded/sign_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed("missing embedded.sign_url"))
    }

    async fn get_status(&self, provider_request_id: &str) -> Result<ProviderStatus, ProviderError> {
        let response = self
            .get(&format!("/signature_request/{provider_request_id}"))
            .send()
            .await?;
        let body = read_json(response).await?;

        let request = body
            .get("signature_request")
            .ok_or_else(|| malformed("missing signature_request"))?;
        let flag = |key: &str| request.get(key).and_then(Value::as_bool).unwrap_or(false);

        Ok(ProviderStatus {
            complete: flag("is_complete"),
            declined: flag("is_declined"),
            errored: flag("has_error"),
        })
    }

    async fn download_document(&self, provider_request_id: &str) -> Result<Bytes, ProviderError> {
        let response = self
            .get(&format!("/signature_request/files/{provider_request_id}"))
            .query(&[("file_type", "pdf")])
            .send()
            .await?;

        // 404: 알 수 없는 요청, 409: 파일 생성 중. 둘 다 "아직 받을 문서 없음"
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::CONFLICT) {
            return Err(ProviderError::DocumentNotReady);
        }
        if !response.status().is_success() {
            return Err(read_json(response).await.err().unwrap_or_else(|| {
                ProviderError::Unavailable("unexpected download response".to_string())
            }));
        }

        Ok(response.bytes().await?)
    }
}

/// 응답 본문을 JSON으로 읽고 에러 봉투를 검사합니다.
///
/// - 본문에 `error` 객체가 있으면 상태 코드와 무관하게 `Rejected`
/// - 에러 봉투 없이 비정상 상태 코드면 `Unavailable`
async fn read_json(response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    let text = response.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if let Some(message) = body.as_ref().and_then(error_message) {
        tracing::warn!(%status, "Provider returned error envelope: {}", message);
        return Err(ProviderError::Rejected(message));
    }
    if !status.is_success() {
        return Err(ProviderError::Unavailable(format!("HTTP {status}: {text}")));
    }
    body.ok_or_else(|| malformed("response body is not JSON"))
}

fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error").filter(|e| !e.is_null())?;
    let message = error
        .get("error_msg")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("Unknown API error");
    Some(message.to_string())
}

// 여러 서명자 템플릿이면 이메일이 일치하는 서명 슬롯을, 아니면 첫 번째 슬롯을 씁니다.
fn signature_id_for(request: &Value, email: &str) -> Option<String> {
    let signatures = request.get("signatures")?.as_array()?;
    let matching = signatures.iter().find(|s| {
        s.get("signer_email_address")
            .and_then(Value::as_str)
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    });
    matching
        .or_else(|| signatures.first())?
        .get("signature_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn malformed(what: &str) -> ProviderError {
    ProviderError::Unavailable(format!("malformed provider response: {what}"))
}
