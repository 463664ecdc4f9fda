use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::json;

use crate::error_handling::types::ProviderError;
use crate::scan_provider::types::{ScanPoll, ScanReport, ScanSubmission};

/// Operations the lifecycle controller needs from the remote scanning
/// service. Implementations must not retry: a transient failure is reported
/// as `ProviderError::Unavailable` and the controller decides what to do.
#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Submits `url` for scanning and returns the provider's job identifier.
    async fn submit(&self, url: &str) -> Result<ScanSubmission, ProviderError>;

    /// Polls for the result of a previously submitted scan. A scan still in
    /// progress is `ScanPoll::Pending`, not an error.
    async fn fetch_result(&self, job_id: &str) -> Result<ScanPoll, ProviderError>;
}

/// HTTP client for the remote scanning service.
///
/// Wire contract: `POST <base>/scans` submits and returns `{ uuid, … }`;
/// `GET <base>/scans/<uuid>/result` returns the structured report, with
/// HTTP 404 and 202 meaning "not ready yet". Auth is a bearer token.
pub struct HttpScanProvider {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpScanProvider {
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }
}

#[async_trait]
impl ScanProvider for HttpScanProvider {
    async fn submit(&self, url: &str) -> Result<ScanSubmission, ProviderError> {
        let endpoint = format!("{}/scans", self.base_url);
        debug!("Submitting {} to {}", url, endpoint);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_token)
            .json(&json!({ "url": url, "visibility": "unlisted" }))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ProviderError::Unavailable(format!(
                "submit returned HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Provider rejected {}: HTTP {} {}", url, status, body);
            return Err(ProviderError::Rejected(format!(
                "HTTP {}: {}",
                status,
                truncate(&body, 200)
            )));
        }
        response
            .json::<ScanSubmission>()
            .await
            .map_err(|e| ProviderError::Api(format!("malformed submit response: {}", e)))
    }

    async fn fetch_result(&self, job_id: &str) -> Result<ScanPoll, ProviderError> {
        let endpoint = format!("{}/scans/{}/result", self.base_url, job_id);
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        // The provider answers 404 until the scan is indexed and 202 while
        // it is still running.
        if status.as_u16() == 404 || status.as_u16() == 202 {
            debug!("Scan {} not ready yet (HTTP {})", job_id, status);
            return Ok(ScanPoll::Pending);
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ProviderError::Unavailable(format!(
                "result returned HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "HTTP {}: {}",
                status,
                truncate(&body, 200)
            )));
        }
        let report = response
            .json::<ScanReport>()
            .await
            .map_err(|e| ProviderError::Api(format!("malformed report: {}", e)))?;
        Ok(ScanPoll::Ready(Box::new(report)))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let provider = HttpScanProvider::new(
            "https://scanner.example/api/v1/",
            "token",
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(provider.base_url, "https://scanner.example/api/v1");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("héllo wörld", 4), "héll");
    }
}
