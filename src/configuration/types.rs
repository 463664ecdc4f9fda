use serde::Deserialize;

/// Connection settings for the remote scanning service.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of the provider API, e.g. `https://scanner.example/api/v1`.
    pub base_url: String,
    /// Bearer token presented on every call.
    pub api_token: String,
    /// Per-attempt timeout; exceeding it counts as a transient failure.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_timeout_secs() -> u64 {
    30
}

/// SMTP relay settings for report delivery. Optional: without them the
/// service runs with email delivery disabled.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, e.g. `reports@vigie.example`.
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Bounds for retrying transient remote and storage failures.
///
/// Polling for a scan result is not covered by these bounds; polls repeat
/// until the session deadline.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}
