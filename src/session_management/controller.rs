use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::configuration::types::RetryConfig;
use crate::error_handling::types::{ControllerError, ProviderError, StoreError};
use crate::notify::Notifier;
use crate::report::ReportRenderer;
use crate::scan_provider::types::ScanPoll;
use crate::scan_provider::ScanProvider;
use crate::session_management::session::{Provenance, Session, SessionView};
use crate::session_management::SessionStatus;
use crate::storage::report_store::artifact_key;
use crate::storage::{ReportStore, SessionStore};

/// What a single `advance` invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A transition was committed; the session now has this status.
    Advanced(SessionStatus),
    /// Nothing to do: terminal session, or the provider is still scanning.
    Unchanged,
    /// Another invocation advanced the session first; this one discarded
    /// its computed effect.
    Superseded,
}

/// The scan session state machine.
///
/// Owns every transition: the pipeline is driven by calling [`advance`]
/// repeatedly, from any driver, for any session, in any interleaving. The
/// only durable state is the session record itself, so each step is
/// resumable after a crash. Per-session mutual exclusion comes from the
/// store's compare-and-swap keyed on the status observed at read time: a
/// lost swap means another invocation won, and this one throws its work
/// away.
///
/// Remote, render and storage failures never leave this struct as errors;
/// they are converted into a `failed` session so a bad session can never
/// take down the driver of the others.
///
/// [`advance`]: LifecycleController::advance
pub struct LifecycleController {
    sessions: Arc<dyn SessionStore>,
    reports: Arc<dyn ReportStore>,
    provider: Arc<dyn ScanProvider>,
    renderer: Arc<dyn ReportRenderer>,
    notifier: Arc<dyn Notifier>,
    retry: RetryConfig,
    session_ttl: chrono::Duration,
    provider_timeout: Duration,
}

impl LifecycleController {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        reports: Arc<dyn ReportStore>,
        provider: Arc<dyn ScanProvider>,
        renderer: Arc<dyn ReportRenderer>,
        notifier: Arc<dyn Notifier>,
        retry: RetryConfig,
        session_ttl_hours: u64,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            reports,
            provider,
            renderer,
            notifier,
            retry,
            session_ttl: chrono::Duration::hours(session_ttl_hours as i64),
            provider_timeout,
        }
    }

    /// Validates the request and writes a fresh `queued` session.
    pub async fn create_session(
        &self,
        url: &str,
        email: Option<String>,
        provenance: Provenance,
    ) -> Result<Uuid, ControllerError> {
        let url = validate_url(url)?;
        if let Some(addr) = &email {
            validate_email(addr)?;
        }
        let session = Session::new(url, email, provenance, Utc::now(), self.session_ttl);
        let id = session.id;
        self.sessions.create(&session).await?;
        info!("session {} created for {}", id, session.url);
        Ok(id)
    }

    /// Read-only projection for polling clients. Never mutates.
    pub async fn get_status(&self, id: Uuid) -> Result<SessionView, ControllerError> {
        let session = self.sessions.get(id).await?;
        Ok(session.view(Utc::now()))
    }

    /// Returns the finished PDF artifact for download.
    pub async fn get_report(&self, id: Uuid) -> Result<Vec<u8>, ControllerError> {
        let session = self.sessions.get(id).await?;
        let expired = session.status == SessionStatus::Expired
            || (!session.status.is_terminal() && session.is_expired(Utc::now()));
        if expired {
            return Err(ControllerError::Expired);
        }
        let key = match &session.artifact_key {
            Some(key) => key,
            None => return Err(ControllerError::ArtifactMissing),
        };
        match self.reports.get(key).await {
            Ok(bytes) => Ok(bytes),
            Err(StoreError::NotFound) => Err(ControllerError::ArtifactMissing),
            Err(e) => Err(ControllerError::Store(e)),
        }
    }

    /// Performs the next pipeline step for `id`, if any.
    ///
    /// Idempotent and safe under concurrent or redundant invocation: the
    /// transition only commits if the status is still the one observed at
    /// read time. A session past its deadline is flipped to `expired`
    /// instead of being advanced.
    pub async fn advance(self: &Arc<Self>, id: Uuid) -> Result<StepOutcome, ControllerError> {
        let session = self.sessions.get(id).await?;
        if session.status.is_terminal() {
            return Ok(StepOutcome::Unchanged);
        }
        let now = Utc::now();
        if session.is_expired(now) {
            info!("session {} passed its deadline, expiring", id);
            return self
                .commit(&session, session.with_status(SessionStatus::Expired, now))
                .await;
        }
        match session.status {
            SessionStatus::Queued => self.step_submit(&session).await,
            SessionStatus::Scanning => self.step_poll(&session).await,
            SessionStatus::Generating => self.step_generate(&session).await,
            SessionStatus::Uploading => self.step_finalize(&session).await,
            SessionStatus::Sending => {
                // A crash mid-delivery strands the session here; delivery is
                // best effort, so restore `completed` and move on.
                self.commit(&session, session.with_status(SessionStatus::Completed, now))
                    .await
            }
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Expired => {
                Ok(StepOutcome::Unchanged)
            }
        }
    }

    /// Triggers an email delivery for a finished scan.
    ///
    /// Allowed only once the session is `completed`. The address is stored
    /// set-once; delivery itself is fire and forget and can never revert or
    /// fail the scan session.
    pub async fn record_email_request(
        self: &Arc<Self>,
        id: Uuid,
        email: &str,
    ) -> Result<(), ControllerError> {
        validate_email(email)?;
        let session = self.sessions.get(id).await?;
        if session.status != SessionStatus::Completed {
            return Err(ControllerError::Conflict(format!(
                "session is {}, report email requires a completed scan",
                session.status
            )));
        }
        if session.email.is_none() {
            let mut next = session.clone();
            next.email = Some(email.to_string());
            next.updated_at = Utc::now();
            // A lost swap only means a concurrent email request got there
            // first; the delivery below still runs.
            let _ = self
                .sessions
                .compare_and_swap(id, SessionStatus::Completed, &next)
                .await?;
        }
        self.spawn_email_flow(id, email.to_string());
        Ok(())
    }

    // --- pipeline steps -------------------------------------------------

    async fn step_submit(&self, session: &Session) -> Result<StepOutcome, ControllerError> {
        let submission = self
            .with_retries("submit", || self.provider.submit(&session.url))
            .await;
        match submission {
            Ok(submission) => {
                let mut next = session.with_status(SessionStatus::Scanning, Utc::now());
                next.job_id = Some(submission.uuid);
                self.commit(session, next).await
            }
            Err(e) => self.fail(session, format!("Scan submission failed: {}", e)).await,
        }
    }

    async fn step_poll(&self, session: &Session) -> Result<StepOutcome, ControllerError> {
        let job_id = match &session.job_id {
            Some(job_id) => job_id,
            None => return self.fail(session, "Scan identifier missing".to_string()).await,
        };
        let poll = self
            .with_retries("poll", || self.provider.fetch_result(job_id))
            .await;
        match poll {
            Ok(ScanPoll::Pending) => {
                debug!("session {} still scanning", session.id);
                Ok(StepOutcome::Unchanged)
            }
            Ok(ScanPoll::Ready(_)) => {
                self.commit(session, session.with_status(SessionStatus::Generating, Utc::now()))
                    .await
            }
            Err(e) => self.fail(session, format!("Scan failed: {}", e)).await,
        }
    }

    async fn step_generate(&self, session: &Session) -> Result<StepOutcome, ControllerError> {
        let job_id = match &session.job_id {
            Some(job_id) => job_id,
            None => return self.fail(session, "Scan identifier missing".to_string()).await,
        };
        let report = match self
            .with_retries("fetch result", || self.provider.fetch_result(job_id))
            .await
        {
            Ok(ScanPoll::Ready(report)) => report,
            Ok(ScanPoll::Pending) => {
                // The provider briefly un-publishes results while indexing;
                // wait for the next tick rather than failing.
                debug!("session {} result not readable yet", session.id);
                return Ok(StepOutcome::Unchanged);
            }
            Err(e) => {
                return self
                    .fail(session, format!("Fetching scan result failed: {}", e))
                    .await
            }
        };
        let pdf = match self.renderer.render(&report, &session.url) {
            Ok(pdf) => pdf,
            Err(e) => {
                return self
                    .fail(session, format!("Report generation failed: {}", e))
                    .await
            }
        };
        let key = artifact_key(session.id);
        if let Err(e) = self.put_with_retries(&key, &pdf).await {
            return self.fail(session, format!("Storing report failed: {}", e)).await;
        }
        let mut next = session.with_status(SessionStatus::Uploading, Utc::now());
        next.artifact_key = Some(key);
        self.commit(session, next).await
    }

    async fn step_finalize(self: &Arc<Self>, session: &Session) -> Result<StepOutcome, ControllerError> {
        let key = match &session.artifact_key {
            Some(key) => key.clone(),
            None => return self.fail(session, "Report artifact missing".to_string()).await,
        };
        if let Err(e) = self.reports.get(&key).await {
            return self
                .fail(session, format!("Report artifact unreadable: {}", e))
                .await;
        }
        let outcome = self
            .commit(session, session.with_status(SessionStatus::Completed, Utc::now()))
            .await?;
        if outcome == StepOutcome::Advanced(SessionStatus::Completed) {
            if let Some(email) = &session.email {
                self.spawn_email_flow(session.id, email.clone());
            }
        }
        Ok(outcome)
    }

    // --- email sub-flow -------------------------------------------------

    fn spawn_email_flow(self: &Arc<Self>, id: Uuid, to: String) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.run_email_flow(id, &to).await;
        });
    }

    /// CAS `completed -> sending`, attempt delivery, CAS back to
    /// `completed` regardless of the outcome.
    async fn run_email_flow(&self, id: Uuid, to: &str) {
        let session = match self.sessions.get(id).await {
            Ok(session) => session,
            Err(e) => {
                warn!("email flow: session {} unreadable: {}", id, e);
                return;
            }
        };
        if session.status != SessionStatus::Completed {
            debug!("email flow: session {} is {}, skipping", id, session.status);
            return;
        }
        let sending = session.with_status(SessionStatus::Sending, Utc::now());
        match self
            .sessions
            .compare_and_swap(id, SessionStatus::Completed, &sending)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("email flow: session {} taken by another sender", id);
                return;
            }
            Err(e) => {
                warn!("email flow: session {} swap failed: {}", id, e);
                return;
            }
        }

        let delivery = async {
            let key = artifact_key(id);
            let pdf = self.reports.get(&key).await.map_err(|e| e.to_string())?;
            self.notifier
                .send_report(to, &session.url, &pdf)
                .await
                .map_err(|e| e.to_string())
        }
        .await;
        match delivery {
            Ok(()) => info!("session {}: report emailed to {}", id, to),
            Err(e) => warn!("session {}: email delivery failed: {}", id, e),
        }

        let done = sending.with_status(SessionStatus::Completed, Utc::now());
        if let Err(e) = self
            .sessions
            .compare_and_swap(id, SessionStatus::Sending, &done)
            .await
        {
            warn!("email flow: session {} could not return to completed: {}", id, e);
        }
    }

    // --- helpers --------------------------------------------------------

    /// Commits `next` only if the session still has the status observed at
    /// read time. A lost swap discards the computed effect.
    async fn commit(
        &self,
        observed: &Session,
        next: Session,
    ) -> Result<StepOutcome, ControllerError> {
        let won = self
            .sessions
            .compare_and_swap(observed.id, observed.status, &next)
            .await?;
        if won {
            info!(
                "session {}: {} -> {}",
                observed.id, observed.status, next.status
            );
            Ok(StepOutcome::Advanced(next.status))
        } else {
            warn!(
                "session {}: discarding {} step, another invocation advanced first",
                observed.id, observed.status
            );
            Ok(StepOutcome::Superseded)
        }
    }

    async fn fail(
        &self,
        session: &Session,
        error: String,
    ) -> Result<StepOutcome, ControllerError> {
        error!("session {}: {}", session.id, error);
        let next = session.with_failure(error, Utc::now());
        self.commit(session, next).await
    }

    /// Runs a provider call with a per-attempt timeout, retrying transient
    /// failures with exponential backoff. `Rejected` and malformed-reply
    /// errors are permanent and returned immediately.
    async fn with_retries<T, F, Fut>(&self, what: &str, op: F) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match tokio::time::timeout(self.provider_timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Unavailable(format!("{} timed out", what)),
            };
            let transient = matches!(err, ProviderError::Unavailable(_));
            if !transient || attempt >= self.retry.max_attempts.max(1) {
                return Err(err);
            }
            let delay = backoff_delay(self.retry.base_delay_ms, attempt);
            warn!(
                "{} attempt {}/{} failed: {}, retrying in {:?}",
                what, attempt, self.retry.max_attempts, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn put_with_retries(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.reports.put(key, bytes).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if attempt >= self.retry.max_attempts.max(1) {
                return Err(err);
            }
            let delay = backoff_delay(self.retry.base_delay_ms, attempt);
            warn!(
                "artifact write attempt {}/{} failed: {}, retrying in {:?}",
                attempt, self.retry.max_attempts, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << (attempt - 1).min(16)))
}

fn validate_url(raw: &str) -> Result<String, ControllerError> {
    if raw.trim().is_empty() {
        return Err(ControllerError::Validation("URL must not be empty".to_string()));
    }
    let parsed = url::Url::parse(raw)
        .map_err(|e| ControllerError::Validation(format!("invalid URL: {}", e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ControllerError::Validation(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ControllerError::Validation("URL has no host".to_string()));
    }
    Ok(parsed.to_string())
}

fn validate_email(addr: &str) -> Result<(), ControllerError> {
    let mut parts = addr.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ControllerError::Validation(format!(
            "invalid email address: {}",
            addr
        ))),
    }
}
