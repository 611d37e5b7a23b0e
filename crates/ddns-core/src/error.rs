//! Error types for the DDNS agent
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS agent
#[derive(Error, Debug)]
pub enum Error {
    /// Every lookup endpoint failed during a single resolution
    #[error("IP resolution failed: {0}")]
    Resolution(String),

    /// The bounded startup resolution never produced an address
    #[error("No IP address after {attempts} startup attempts: {last_error}")]
    StartupResolutionExhausted {
        /// Number of attempts made
        attempts: usize,
        /// Message of the last failure
        last_error: String,
    },

    /// Connection-level HTTP failure (DNS, TLS, timeout, reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The provider answered with an empty body
    #[error("Empty response from provider for {0}")]
    EmptyResponse(String),

    /// No configured hostname could be updated in a cycle
    #[error("Update failed for every host: {0}")]
    UpdateFailed(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Create an empty-response error
    pub fn empty_response(hostname: impl Into<String>) -> Self {
        Self::EmptyResponse(hostname.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error comes from the HTTP layer rather than from the
    /// provider's answer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
