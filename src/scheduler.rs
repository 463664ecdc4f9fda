//! Pipeline driver.
//!
//! The lifecycle controller is deliberately passive: something has to call
//! `advance` for progress to happen. This timer is that something. Each
//! tick lists the non-terminal sessions and spawns one `advance` per
//! session; a session that fails, hangs on a retry or loses its swap can
//! never stall the tick loop or the other sessions.
//!
//! The web layer additionally fires a first `advance` right after a
//! session is created, so submission does not wait for the next tick.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use crate::session_management::controller::LifecycleController;
use crate::storage::SessionStore;

pub struct Scheduler {
    controller: Arc<LifecycleController>,
    sessions: Arc<dyn SessionStore>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        controller: Arc<LifecycleController>,
        sessions: Arc<dyn SessionStore>,
        interval: Duration,
    ) -> Self {
        Self {
            controller,
            sessions,
            interval,
        }
    }

    /// Runs the tick loop forever.
    pub async fn run(&self) {
        info!("Scheduler started, ticking every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Advances every active session once. Errors are logged, never raised.
    pub async fn tick(&self) {
        let active = match self.sessions.list_active().await {
            Ok(active) => active,
            Err(e) => {
                error!("Scheduler could not list active sessions: {}", e);
                return;
            }
        };
        if active.is_empty() {
            return;
        }
        debug!("Scheduler advancing {} active session(s)", active.len());
        for session in active {
            let controller = Arc::clone(&self.controller);
            tokio::spawn(async move {
                if let Err(e) = controller.advance(session.id).await {
                    error!("advance failed for session {}: {}", session.id, e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::RetryConfig;
    use crate::error_handling::types::{ProviderError, StoreError};
    use crate::notify::NoopNotifier;
    use crate::report::ReportRenderer;
    use crate::scan_provider::types::{ScanPoll, ScanReport, ScanSubmission};
    use crate::scan_provider::ScanProvider;
    use crate::session_management::session::Provenance;
    use crate::session_management::SessionStatus;
    use crate::storage::{MemorySessionStore, ReportStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ScriptedProvider;

    #[async_trait]
    impl ScanProvider for ScriptedProvider {
        async fn submit(&self, _url: &str) -> Result<ScanSubmission, ProviderError> {
            Ok(ScanSubmission {
                uuid: "job-1".to_string(),
                result: None,
                visibility: None,
            })
        }

        async fn fetch_result(&self, _job_id: &str) -> Result<ScanPoll, ProviderError> {
            Ok(ScanPoll::Ready(Box::new(ScanReport::default())))
        }
    }

    struct MemoryReports(Mutex<HashMap<String, Vec<u8>>>);

    #[async_trait]
    impl ReportStore for MemoryReports {
        async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
            self.0.lock().unwrap().insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            self.0
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or(StoreError::NotFound)
        }
    }

    struct TinyRenderer;

    impl ReportRenderer for TinyRenderer {
        fn render(
            &self,
            _report: &ScanReport,
            _url: &str,
        ) -> Result<Vec<u8>, crate::error_handling::types::RenderError> {
            Ok(b"%PDF-tiny".to_vec())
        }
    }

    #[tokio::test]
    async fn test_ticks_drive_a_session_to_completion() {
        let sessions = Arc::new(MemorySessionStore::new());
        let controller = Arc::new(LifecycleController::new(
            sessions.clone(),
            Arc::new(MemoryReports(Mutex::new(HashMap::new()))),
            Arc::new(ScriptedProvider),
            Arc::new(TinyRenderer),
            Arc::new(NoopNotifier),
            RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
            },
            24,
            Duration::from_secs(1),
        ));
        let scheduler = Scheduler::new(controller.clone(), sessions.clone(), Duration::from_millis(10));

        let id = controller
            .create_session("https://example.com", None, Provenance::default())
            .await
            .unwrap();

        // Four pipeline steps, one tick each; spawned advances need a few
        // yields to land before the next tick reads the store.
        for _ in 0..8 {
            scheduler.tick().await;
            for _ in 0..20 {
                tokio::task::yield_now().await;
            }
        }

        let session = sessions.get(id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_tick_survives_empty_store() {
        let sessions = Arc::new(MemorySessionStore::new());
        let controller = Arc::new(LifecycleController::new(
            sessions.clone(),
            Arc::new(MemoryReports(Mutex::new(HashMap::new()))),
            Arc::new(ScriptedProvider),
            Arc::new(TinyRenderer),
            Arc::new(NoopNotifier),
            RetryConfig::default(),
            24,
            Duration::from_secs(1),
        ));
        let scheduler = Scheduler::new(controller, sessions, Duration::from_millis(10));
        scheduler.tick().await; // must not panic or hang
    }
}
