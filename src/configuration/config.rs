use super::types::{ProviderConfig, RetryConfig, SmtpConfig};
use crate::error_handling::types::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration that defines all runtime parameters.
///
/// Loaded from a TOML file named on the command line. Validation happens at
/// load time so a bad deployment fails at startup, not mid-pipeline.
///
/// # Fields Overview
///
/// - `bind_address`: IP address the HTTP API binds to
/// - `web_port`: TCP port for the HTTP API
/// - `storage_path`: directory for the session database and report artifacts
/// - `database_file`: SQLite file name under `storage_path`; omit to keep
///   sessions in memory only
/// - `session_ttl_hours`: hard deadline after which a session can only expire
/// - `scheduler_interval_secs`: cadence of the pipeline-driving timer
/// - `provider`: remote scanning service settings
/// - `smtp`: optional SMTP relay; absent means email delivery is disabled
/// - `retry`: bounds for retrying transient failures
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_address: String,
    pub web_port: u16,
    pub storage_path: PathBuf,
    #[serde(default)]
    pub database_file: Option<String>,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    #[serde(default = "default_scheduler_interval_secs")]
    pub scheduler_interval_secs: u64,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_session_ttl_hours() -> u64 {
    24
}

fn default_scheduler_interval_secs() -> u64 {
    5
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigError::BadBindAddress(format!(
                "{} is not an IP address",
                self.bind_address
            )));
        }
        if self.web_port < 1024 {
            return Err(ConfigError::BadPort(format!(
                "port {} is reserved",
                self.web_port
            )));
        }
        if self.provider.base_url.is_empty() {
            return Err(ConfigError::MissingProvider(
                "provider.base_url must not be empty".to_string(),
            ));
        }
        if self.provider.api_token.is_empty() {
            return Err(ConfigError::MissingProvider(
                "provider.api_token must not be empty".to_string(),
            ));
        }
        if self.session_ttl_hours == 0 {
            return Err(ConfigError::NotInRange(
                "session_ttl_hours must be at least 1".to_string(),
            ));
        }
        if self.scheduler_interval_secs == 0 {
            return Err(ConfigError::NotInRange(
                "scheduler_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
bind_address = "0.0.0.0"
web_port = 8080
storage_path = "/var/lib/vigie"
database_file = "vigie.sqlite3"
session_ttl_hours = 24

[provider]
base_url = "https://scanner.example/api/v1"
api_token = "secret-token"

[smtp]
host = "smtp.example.com"
username = "mailer"
password = "hunter2"
from = "reports@vigie.example"

[retry]
max_attempts = 3
base_delay_ms = 250
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_file_parses_sample() {
        let file = write_config(SAMPLE);
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.web_port, 8080);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.scheduler_interval_secs, 5); // default
        assert_eq!(config.provider.timeout_secs, 30); // default
        assert_eq!(config.retry.base_delay_ms, 250);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587); // default
        assert_eq!(smtp.host, "smtp.example.com");
    }

    #[test]
    fn test_smtp_section_is_optional() {
        let file = write_config(
            r#"
bind_address = "127.0.0.1"
web_port = 8080
storage_path = "/tmp/vigie"

[provider]
base_url = "https://scanner.example"
api_token = "t"
"#,
        );
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.smtp.is_none());
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_addr = SAMPLE.replace("0.0.0.0", "not-an-ip");
        let file = write_config(&bad_addr);
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::BadBindAddress(_))
        ));

        let bad_token = SAMPLE.replace("secret-token", "");
        let file = write_config(&bad_token);
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::MissingProvider(_))
        ));

        let bad_ttl = SAMPLE.replace("session_ttl_hours = 24", "session_ttl_hours = 0");
        let file = write_config(&bad_ttl);
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::NotInRange(_))
        ));
    }
}
