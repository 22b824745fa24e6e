//! Error types for the ResKit client

use thiserror::Error;

/// Main error type for ResKit client operations
#[derive(Debug, Error)]
pub enum ReskitError {
    /// Transport-level failure (connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service rejected the call: non-2xx status or a payload `error` field
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// Message taken from the payload, or a generic fallback
        message: String,
    },

    /// Missing or invalid auth token
    #[error("Auth error: {0}")]
    Auth(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Live channel failure (connect, send, closed socket)
    #[error("Live channel error: {0}")]
    LiveChannel(String),

    /// Malformed packet on the live channel
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using ReskitError
pub type Result<T> = std::result::Result<T, ReskitError>;

impl ReskitError {
    /// Create an API rejection error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ReskitError::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(msg: impl Into<String>) -> Self {
        ReskitError::Auth(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        ReskitError::Config(msg.into())
    }

    /// Create a live channel error
    pub fn live(msg: impl Into<String>) -> Self {
        ReskitError::LiveChannel(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        ReskitError::Protocol(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ReskitError::Validation(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        ReskitError::Other(msg.into())
    }

    /// HTTP status attached to the error, if the service produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ReskitError::Api { status, .. } => Some(*status),
            ReskitError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this failure means the stored token is missing or rejected
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ReskitError::Auth(_)) || matches!(self.status(), Some(401) | Some(403))
    }
}
