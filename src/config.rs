//! Clearway configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main Clearway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearwayConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream customs API configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl ClearwayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty = allow any)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Session cookie name
    pub session_cookie: String,

    /// Idle session lifetime in seconds before cleanup
    pub session_max_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8460,
            cors_origins: vec![],
            session_cookie: "clearway_session".to_string(),
            session_max_idle_secs: 3600,
        }
    }
}

/// Upstream customs API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the customs API; the `documents`, `send` and `review-hts`
    /// resources hang off this
    pub base_url: String,

    /// Name of the environment variable holding the bearer token
    pub bearer_token_ref: String,

    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,

    /// Retry policy for the shared client
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-cert.customscity.com/api".to_string(),
            bearer_token_ref: "CUSTOMSCITY_BEARER_TOKEN".to_string(),
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// Resolve the bearer token from the configured environment variable
    pub fn resolve_token(&self) -> Result<String> {
        std::env::var(&self.bearer_token_ref).map_err(|_| {
            Error::Config(format!(
                "Failed to resolve bearer token from env var: {}",
                self.bearer_token_ref
            ))
        })
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the documents resource
    pub fn documents_url(&self) -> String {
        format!("{}/documents", self.base_url)
    }

    /// URL of the send resource
    pub fn send_url(&self) -> String {
        format!("{}/send", self.base_url)
    }

    /// URL of the review-hts resource
    pub fn review_hts_url(&self) -> String {
        format!("{}/review-hts", self.base_url)
    }
}

/// Retry policy applied to every outbound call
///
/// Retries trigger only on the listed HTTP status codes. Connection failures,
/// timeouts and other 4xx responses surface immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,

    /// Base backoff in milliseconds; doubled after each failed attempt
    pub backoff_ms: u64,

    /// Status codes that trigger a retry
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 2000,
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Whether a status code should trigger a retry
    pub fn should_retry(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Escalating delay before the retry following failed attempt `attempt`
    /// (0-based): `backoff_ms * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}
