use crate::error_handling::types::StoreError;
use async_trait::async_trait;
use uuid::Uuid;

/// Blob storage for finished PDF artifacts, keyed per session.
///
/// Keys derive from the session id, so re-uploading the same session's
/// artifact overwrites deterministically instead of duplicating.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Writes (or overwrites) the artifact stored under `key`.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Retrieves the artifact stored under `key`, failing with
    /// `StoreError::NotFound` if nothing was stored.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Canonical report-store key for a session's artifact.
pub fn artifact_key(session_id: Uuid) -> String {
    format!("{}.pdf", session_id)
}
