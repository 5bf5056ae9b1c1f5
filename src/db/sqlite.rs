//! # SQLite 세션 저장소
//!
//! `DATABASE_URL`이 설정되었을 때 사용하는 영속 저장소입니다.
//! 역색인은 별도 맵이 아니라 `provider_request_id` 컬럼의 UNIQUE 인덱스입니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions; // 연결 풀 설정 (최대 연결 수 등)
use sqlx::SqlitePool; // 내부적으로 Arc라 clone해도 같은 풀을 가리킵니다

use super::SessionStore;
use crate::error::StoreError;
use crate::models::{SessionStatus, SessionUpdate, SignerInfo, SigningSession};

/// `signing_sessions` 테이블 한 행
///
/// 서명자 스냅샷은 컬럼 네 개로 펼쳐 저장하고, status는 소문자 문자열입니다.
// sqlx::FromRow: 쿼리 결과의 컬럼 이름과 필드 이름을 맞춰 자동 매핑
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    provider_request_id: String,
    provider_signer_ref: String,
    signer_email: String,
    signer_name: String,
    signer_role: String,
    signer_phone: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    signing_url: String,
    signed_at: Option<DateTime<Utc>>,
    documents_available: bool,
    declined_at: Option<DateTime<Utc>>,
    decline_reason: Option<String>,
    voided_at: Option<DateTime<Utc>>,
    last_signature_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for SigningSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<SessionStatus>()
            .map_err(StoreError::Corrupt)?;

        Ok(SigningSession {
            session_id: row.session_id,
            provider_request_id: row.provider_request_id,
            provider_signer_ref: row.provider_signer_ref,
            signer: SignerInfo {
                email: row.signer_email,
                name: row.signer_name,
                role: row.signer_role,
                phone: row.signer_phone,
            },
            status,
            created_at: row.created_at,
            expires_at: row.expires_at,
            signing_url: row.signing_url,
            signed_at: row.signed_at,
            documents_available: row.documents_available,
            declined_at: row.declined_at,
            decline_reason: row.decline_reason,
            voided_at: row.voided_at,
            last_signature_at: row.last_signature_at,
        })
    }
}

/// SQLite 연결 풀을 감싼 세션 저장소
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// 데이터베이스에 연결하고 마이그레이션을 실행합니다.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    /// 이미 만들어진 풀로 저장소를 구성합니다. 마이그레이션은 여기서 실행됩니다.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn put(&self, session: SigningSession) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO signing_sessions (
                session_id, provider_request_id, provider_signer_ref,
                signer_email, signer_name, signer_role, signer_phone,
                status, created_at, expires_at, signing_url,
                signed_at, documents_available, declined_at, decline_reason,
                voided_at, last_signature_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.provider_request_id)
        .bind(&session.provider_signer_ref)
        .bind(&session.signer.email)
        .bind(&session.signer.name)
        .bind(&session.signer.role)
        .bind(session.signer.phone.as_deref())
        .bind(session.status.as_str())
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(&session.signing_url)
        .bind(session.signed_at)
        .bind(session.documents_available)
        .bind(session.declined_at)
        .bind(session.decline_reason.as_deref())
        .bind(session.voided_at)
        .bind(session.last_signature_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // PRIMARY KEY 또는 provider_request_id UNIQUE 위반
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateSession(session.session_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<SigningSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT session_id, provider_request_id, provider_signer_ref,
                   signer_email, signer_name, signer_role, signer_phone,
                   status, created_at, expires_at, signing_url,
                   signed_at, documents_available, declined_at, decline_reason,
                   voided_at, last_signature_at
            FROM signing_sessions
            WHERE session_id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SigningSession::try_from).transpose()
    }

    async fn index_by_request_id(
        &self,
        provider_request_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let session_id = sqlx::query_scalar::<_, String>(
            "SELECT session_id FROM signing_sessions WHERE provider_request_id = ?",
        )
        .bind(provider_request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session_id)
    }

    async fn update(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<SigningSession, StoreError> {
        // COALESCE(?, col): 바인딩 값이 NULL(None)이면 기존 값을 유지합니다.
        let result = sqlx::query(
            r#"
            UPDATE signing_sessions
            SET status              = COALESCE(?, status),
                signed_at           = COALESCE(?, signed_at),
                documents_available = COALESCE(?, documents_available),
                declined_at         = COALESCE(?, declined_at),
                decline_reason      = COALESCE(?, decline_reason),
                voided_at           = COALESCE(?, voided_at),
                last_signature_at   = COALESCE(?, last_signature_at)
            WHERE session_id = ?
            "#,
        )
        .bind(update.status.map(SessionStatus::as_str))
        .bind(update.signed_at)
        .bind(update.documents_available)
        .bind(update.declined_at)
        .bind(update.decline_reason.as_deref())
        .bind(update.voided_at)
        .bind(update.last_signature_at)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(session_id.to_string()));
        }

        self.get(session_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }
}
