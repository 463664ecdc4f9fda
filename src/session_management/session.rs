use crate::session_management::SessionStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Write-once request metadata captured when a session is created.
///
/// Used only for audit and display, never for transition decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
}

/// One end-to-end scan request and its tracked progress.
///
/// The session record is the only durable state of the pipeline: every
/// field the controller needs to resume after a crash lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub url: String,
    pub email: Option<String>,
    pub status: SessionStatus,
    /// Provider-side scan identifier, absent until submission succeeds.
    pub job_id: Option<String>,
    /// Report store key, absent until the PDF has been written.
    pub artifact_key: Option<String>,
    /// Short failure detail, set if and only if `status` is `Failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Hard deadline: past this instant the session may only flip to `Expired`.
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
}

impl Session {
    pub fn new(
        url: String,
        email: Option<String>,
        provenance: Provenance,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Session {
            id: Uuid::new_v4(),
            url,
            email,
            status: SessionStatus::Queued,
            job_id: None,
            artifact_key: None,
            error: None,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
            ip_address: provenance.ip_address,
            user_agent: provenance.user_agent,
            country: provenance.country,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns a copy transitioned to `status`, with `updated_at` refreshed.
    ///
    /// `error` is cleared on every transition except the one into `Failed`,
    /// keeping the `error` iff `failed` invariant.
    pub fn with_status(&self, status: SessionStatus, now: DateTime<Utc>) -> Session {
        let mut next = self.clone();
        next.status = status;
        next.updated_at = now;
        if status != SessionStatus::Failed {
            next.error = None;
        }
        next
    }

    pub fn with_failure(&self, error: String, now: DateTime<Utc>) -> Session {
        let mut next = self.with_status(SessionStatus::Failed, now);
        next.error = Some(error);
        next
    }

    /// Read-only projection served to polling clients.
    ///
    /// A non-terminal session past its deadline is shown as `expired`
    /// without touching the store; the next `advance` persists the flip.
    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let status = if !self.status.is_terminal() && self.is_expired(now) {
            SessionStatus::Expired
        } else {
            self.status
        };
        SessionView {
            id: self.id,
            url: self.url.clone(),
            status,
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What a polling client sees: always well-formed, never a raw fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub url: String,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
