use std::io;

use thiserror::Error;

/// Result type used across the Faultline crates.
pub type Result<T> = std::result::Result<T, FaultlineError>;

/// Canonical error representation shared by all components.
///
/// The variants follow the service's failure taxonomy: client errors
/// (`InvalidParameter`, `ValidationFailed`, `NotFound`), transient
/// store failures (`StoreUnavailable`) and everything unanticipated
/// (`InternalError`). Callers classify on the variant; none of them
/// triggers an automatic retry inside the service.
#[derive(Debug, Error)]
pub enum FaultlineError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FaultlineError {
    /// Whether the failure is attributable to the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FaultlineError::InvalidParameter(_)
                | FaultlineError::ValidationFailed(_)
                | FaultlineError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for FaultlineError {
    fn from(err: serde_json::Error) -> Self {
        FaultlineError::DeserializationError(err.to_string())
    }
}

impl From<sqlx::Error> for FaultlineError {
    fn from(err: sqlx::Error) -> Self {
        let transient = matches!(
            err,
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
        );

        if transient {
            FaultlineError::StoreUnavailable(err.to_string())
        } else {
            FaultlineError::InternalError(err.to_string())
        }
    }
}

impl From<anyhow::Error> for FaultlineError {
    fn from(err: anyhow::Error) -> Self {
        FaultlineError::InternalError(err.to_string())
    }
}

/// Dedicated configuration error used by the configuration module.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for environment variable {key}: {message}")]
    InvalidEnvVar { key: String, message: String },
}

impl From<ConfigError> for FaultlineError {
    fn from(value: ConfigError) -> Self {
        FaultlineError::ConfigError(value.to_string())
    }
}
