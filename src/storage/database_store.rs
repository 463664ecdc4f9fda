use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use uuid::Uuid;

use crate::error_handling::types::StoreError;
use crate::session_management::session::Session;
use crate::session_management::SessionStatus;
use crate::storage::session_store::SessionStore;

// Internal row mapping for sessions to avoid manual try_get
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    url: String,
    email: Option<String>,
    status: String,
    job_id: Option<String>,
    artifact_key: Option<String>,
    error: Option<String>,
    created_at: String,
    updated_at: String,
    expires_at: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    country: Option<String>,
}

fn parse_timestamp(s: &str, field: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            error!("Invalid {} in session row: {}", field, e);
            StoreError::Serialization(format!("invalid {}: {}", field, e))
        })
}

impl SessionRow {
    fn into_session(self) -> Result<Session, StoreError> {
        let status = SessionStatus::parse(&self.status).ok_or_else(|| {
            error!("Unknown status {:?} in session row", self.status);
            StoreError::Serialization(format!("unknown status: {}", self.status))
        })?;
        Ok(Session {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::Serialization(format!("invalid id: {}", e)))?,
            url: self.url,
            email: self.email,
            status,
            job_id: self.job_id,
            artifact_key: self.artifact_key,
            error: self.error,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            expires_at: parse_timestamp(&self.expires_at, "expires_at")?,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            country: self.country,
        })
    }
}

/// SQLite-backed session store.
///
/// The compare-and-swap is expressed as a conditional `UPDATE … WHERE id = ?
/// AND status = ?`; the affected-row count is the swap verdict, so the
/// at-most-one-winner guarantee comes straight from the database.
pub struct DatabaseSessionStore {
    pool: Pool<Sqlite>,
}

impl DatabaseSessionStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::new()
            .filename(path_ref)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| {
                error!("Failed to open session database {}: {}", path_ref.display(), e);
                StoreError::Database(e.to_string())
            })?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                email TEXT,
                status TEXT NOT NULL,
                job_id TEXT,
                artifact_key TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                ip_address TEXT,
                user_agent TEXT,
                country TEXT
            );",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for DatabaseSessionStore {
    async fn get(&self, id: Uuid) -> Result<Session, StoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, url, email, status, job_id, artifact_key, error,
                    created_at, updated_at, expires_at, ip_address, user_agent, country
             FROM sessions WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        match row {
            Some(r) => r.into_session(),
            None => Err(StoreError::NotFound),
        }
    }

    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO sessions
                (id, url, email, status, job_id, artifact_key, error,
                 created_at, updated_at, expires_at, ip_address, user_agent, country)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(session.id.to_string())
        .bind(&session.url)
        .bind(&session.email)
        .bind(session.status.as_str())
        .bind(&session.job_id)
        .bind(&session.artifact_key)
        .bind(&session.error)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(&session.country)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: &Session,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET
                email = ?1, status = ?2, job_id = ?3, artifact_key = ?4, error = ?5,
                updated_at = ?6
             WHERE id = ?7 AND status = ?8",
        )
        .bind(&next.email)
        .bind(next.status.as_str())
        .bind(&next.job_id)
        .bind(&next.artifact_key)
        .bind(&next.error)
        .bind(next.updated_at.to_rfc3339())
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        if result.rows_affected() == 0 {
            // Distinguish a lost swap from a missing row.
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = ?1")
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            if exists == 0 {
                return Err(StoreError::NotFound);
            }
            debug!("cas lost for session {}: status moved past {}", id, expected);
            return Ok(false);
        }
        Ok(true)
    }

    async fn list_active(&self) -> Result<Vec<Session>, StoreError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, url, email, status, job_id, artifact_key, error,
                    created_at, updated_at, expires_at, ip_address, user_agent, country
             FROM sessions
             WHERE status NOT IN ('completed', 'failed', 'expired')
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.into_session()?);
        }
        Ok(out)
    }
}
