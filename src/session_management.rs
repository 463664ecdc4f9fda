//! Session management core module.
//!
//! This module provides the core types and submodules for tracking scan
//! sessions, including the session status state machine, the session
//! entity, and the lifecycle controller that drives the pipeline.

use serde::{Deserialize, Serialize};

/// Submodule for the lifecycle controller implementation.
pub mod controller;
/// Submodule for session data structures and projections.
pub mod session;

/// Represents the current status of a scan session.
///
/// Statuses advance monotonically through the pipeline order, except for
/// the absorbing `Failed` and `Expired` states which are reachable from any
/// non-terminal status:
/// - `Queued`: accepted, not yet submitted to the scan provider.
/// - `Scanning`: submitted, waiting for the provider to finish.
/// - `Generating`: result ready, PDF report being rendered.
/// - `Uploading`: report rendered, artifact being persisted.
/// - `Sending`: email delivery in flight (best effort, returns to `Completed`).
/// - `Completed`: report available for download.
/// - `Failed`: pipeline gave up; `error` carries the detail.
/// - `Expired`: deadline passed before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Queued,
    Scanning,
    Generating,
    Uploading,
    Sending,
    Completed,
    Failed,
    Expired,
}

impl SessionStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Queued => "queued",
            SessionStatus::Scanning => "scanning",
            SessionStatus::Generating => "generating",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Sending => "sending",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<SessionStatus> {
        match s {
            "queued" => Some(SessionStatus::Queued),
            "scanning" => Some(SessionStatus::Scanning),
            "generating" => Some(SessionStatus::Generating),
            "uploading" => Some(SessionStatus::Uploading),
            "sending" => Some(SessionStatus::Sending),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            "expired" => Some(SessionStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStatus;

    #[test]
    fn test_terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Expired.is_terminal());
        assert!(!SessionStatus::Queued.is_terminal());
        assert!(!SessionStatus::Scanning.is_terminal());
        assert!(!SessionStatus::Sending.is_terminal());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            SessionStatus::Queued,
            SessionStatus::Scanning,
            SessionStatus::Generating,
            SessionStatus::Uploading,
            SessionStatus::Sending,
            SessionStatus::Completed,
            SessionStatus::Failed,
            SessionStatus::Expired,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("active"), None);
    }
}
