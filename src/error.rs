//! Clearway error types

use thiserror::Error;

/// Clearway error type
///
/// The first four variants mirror the outcomes a caller can observe through
/// the HTTP surface: `Validation` (400), `Unavailable` (503),
/// `UpstreamStatus` and `Transport` (500).
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad or missing input; never reaches the upstream API
    #[error("{0}")]
    Validation(String),

    /// Upstream unreachable (connection-level failure)
    #[error("Upstream unreachable: {detail}")]
    Unavailable {
        /// Transport-level detail for the `api_error` field
        detail: String,
    },

    /// Upstream reachable but returned a failure status
    #[error("Upstream returned status {status}")]
    UpstreamStatus {
        /// HTTP status returned by the upstream API
        status: u16,
        /// Structured error body, or `{"message": <raw text>}` when the body
        /// is not parseable JSON
        api_error: serde_json::Value,
    },

    /// Request-level transport failure other than a refused connection
    /// (timeout, body read failure). Not retried.
    #[error("Transport error: {detail}")]
    Transport {
        /// Transport-level detail for the `api_error` field
        detail: String,
    },

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Clearway operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Best-effort upstream detail for the `api_error` field of an error
    /// envelope. `Validation` and ambient errors carry no upstream detail.
    pub fn api_error(&self) -> Option<serde_json::Value> {
        match self {
            Error::Unavailable { detail } | Error::Transport { detail } => {
                Some(serde_json::json!({ "detail": detail }))
            }
            Error::UpstreamStatus { api_error, .. } => Some(api_error.clone()),
            _ => None,
        }
    }
}
