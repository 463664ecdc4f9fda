//! Session Store Trait
//!
//! This module defines the `SessionStore` trait, the durable key-value
//! record of session state keyed by session id.
//!
//! Implementors of this trait are responsible for:
//! - Persisting new session records exactly once per id
//! - Retrieving session records by id
//! - Applying transitions atomically through compare-and-swap
//!
//! All methods return a `Result` to handle potential storage errors.

use crate::error_handling::types::StoreError;
use crate::session_management::session::Session;
use crate::session_management::SessionStatus;
use async_trait::async_trait;
use uuid::Uuid;

/// The `SessionStore` trait defines the interface for session persistence
/// backends.
///
/// `compare_and_swap` is the only mutation primitive the controller uses
/// after creation: it guarantees at most one winning writer per transition,
/// which is what makes `advance` safe to call concurrently.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Retrieves a session by id. Fails with `StoreError::NotFound` if the
    /// id is unknown.
    async fn get(&self, id: Uuid) -> Result<Session, StoreError>;

    /// Persists a new session. Fails with `StoreError::Conflict` if the id
    /// already exists.
    async fn create(&self, session: &Session) -> Result<(), StoreError>;

    /// Replaces the stored session with `next` only if the stored status
    /// still equals `expected`. Returns `false` (without writing) when
    /// another writer advanced the session first.
    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: &Session,
    ) -> Result<bool, StoreError>;

    /// Returns all sessions in a non-terminal status, for the scheduler.
    async fn list_active(&self) -> Result<Vec<Session>, StoreError>;
}
