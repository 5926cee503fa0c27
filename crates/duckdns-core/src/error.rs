//! Error types for the DuckDNS updater
//!
//! Transport and remote failures of an update attempt are not errors here:
//! they are recorded as [`UpdateResponse`](crate::traits::UpdateResponse)
//! values so the scheduler can keep running. This type covers what the
//! caller actually has to handle.

use thiserror::Error;

/// Result type alias for updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DuckDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (including empty credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The single-instance rendezvous channel can neither be reached nor bound
    ///
    /// This is fatal: it points at a broken local environment, not a
    /// transient condition.
    #[error("Environment error: {0}")]
    Environment(String),

    /// Config store read/write failures
    #[error("Config store error: {0}")]
    ConfigStore(String),

    /// Raw I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a fatal environment error
    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment(msg.into())
    }

    /// Create a config store error
    pub fn config_store(msg: impl Into<String>) -> Self {
        Self::ConfigStore(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error must terminate the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Environment(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
