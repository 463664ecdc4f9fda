use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use crate::error_handling::types::StoreError;
use crate::session_management::session::Session;
use crate::session_management::SessionStatus;
use crate::storage::session_store::SessionStore;

/// In-process session store backed by a mutex-guarded map.
///
/// Compare-and-swap runs entirely under the lock, so the atomicity
/// guarantee holds even though there is no database underneath.
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Session>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Database("session map lock poisoned".to_string()))
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: Uuid) -> Result<Session, StoreError> {
        let sessions = self.lock()?;
        sessions.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.lock()?;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict);
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: &Session,
    ) -> Result<bool, StoreError> {
        let mut sessions = self.lock()?;
        let current = sessions.get(&id).ok_or(StoreError::NotFound)?;
        if current.status != expected {
            debug!(
                "cas lost for session {}: expected {}, found {}",
                id, expected, current.status
            );
            return Ok(false);
        }
        sessions.insert(id, next.clone());
        Ok(true)
    }

    async fn list_active(&self) -> Result<Vec<Session>, StoreError> {
        let sessions = self.lock()?;
        Ok(sessions
            .values()
            .filter(|s| !s.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_management::session::Provenance;
    use chrono::{Duration, Utc};

    fn session() -> Session {
        Session::new(
            "https://example.com".to_string(),
            None,
            Provenance::default(),
            Utc::now(),
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemorySessionStore::new();
        let s = session();
        store.create(&s).await.unwrap();
        let got = store.get(s.id).await.unwrap();
        assert_eq!(got.id, s.id);
        assert!(matches!(
            store.create(&s).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = MemorySessionStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_cas_wins_only_on_expected_status() {
        let store = MemorySessionStore::new();
        let s = session();
        store.create(&s).await.unwrap();

        let next = s.with_status(SessionStatus::Scanning, Utc::now());
        assert!(store
            .compare_and_swap(s.id, SessionStatus::Queued, &next)
            .await
            .unwrap());

        // A second writer still expecting Queued must lose without writing.
        let stale = s.with_status(SessionStatus::Failed, Utc::now());
        assert!(!store
            .compare_and_swap(s.id, SessionStatus::Queued, &stale)
            .await
            .unwrap());
        assert_eq!(
            store.get(s.id).await.unwrap().status,
            SessionStatus::Scanning
        );
    }

    #[tokio::test]
    async fn test_list_active_skips_terminal() {
        let store = MemorySessionStore::new();
        let a = session();
        let b = session();
        store.create(&a).await.unwrap();
        store.create(&b).await.unwrap();
        let done = b.with_status(SessionStatus::Completed, Utc::now());
        store
            .compare_and_swap(b.id, SessionStatus::Queued, &done)
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);
    }
}
