use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBindAddress(String),
    BadPort(String),
    MissingProvider(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBindAddress(e) => write!(f, "Bind address error: {}", e),
            ConfigError::BadPort(e) => write!(f, "Port error: {}", e),
            ConfigError::MissingProvider(e) => write!(f, "Provider configuration error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Session store and report store failures.
#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Conflict,
    Io(std::io::Error),
    Database(String),
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Record not found"),
            StoreError::Conflict => write!(f, "Record already exists"),
            StoreError::Io(e) => write!(f, "Storage IO error: {}", e),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Remote scan provider failures. The client performs no retries itself;
/// only `Unavailable` is treated as transient by the controller.
#[derive(Debug)]
pub enum ProviderError {
    Unavailable(String),
    Rejected(String),
    Api(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable(e) => write!(f, "Scan provider unavailable: {}", e),
            ProviderError::Rejected(e) => write!(f, "Scan rejected by provider: {}", e),
            ProviderError::Api(e) => write!(f, "Scan provider error: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug)]
pub enum RenderError {
    Pdf(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Pdf(e) => write!(f, "PDF generation failed: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

#[derive(Debug)]
pub enum NotifyError {
    BadAddress(String),
    BuildFailed(String),
    SendFailed(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::BadAddress(e) => write!(f, "Bad email address: {}", e),
            NotifyError::BuildFailed(e) => write!(f, "Failed to build message: {}", e),
            NotifyError::SendFailed(e) => write!(f, "Email send failed: {}", e),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Failures surfaced by the lifecycle controller to its callers.
///
/// Provider, render and notify failures never appear here: `advance`
/// converts them into a `failed` session instead of propagating them.
#[derive(Debug)]
pub enum ControllerError {
    Validation(String),
    NotFound,
    Conflict(String),
    Expired,
    ArtifactMissing,
    Store(StoreError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Validation(e) => write!(f, "Validation error: {}", e),
            ControllerError::NotFound => write!(f, "Session not found"),
            ControllerError::Conflict(e) => write!(f, "Conflict: {}", e),
            ControllerError::Expired => write!(f, "Session expired"),
            ControllerError::ArtifactMissing => write!(f, "Report not available"),
            ControllerError::Store(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ControllerError::NotFound,
            other => ControllerError::Store(other),
        }
    }
}
