//! HTTP client abstraction for outbound customs API calls
//!
//! The `HttpClient` trait separates request execution from the retry and
//! error-normalization policy in [`super::client`], so the policy can be
//! exercised against a mock without real network calls.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A single outbound request to the customs API
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// HTTP method
    pub method: Method,
    /// Full request URL including any query string
    pub url: String,
    /// JSON body, absent for GET/DELETE
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mock lookup key
    fn key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// Raw response from a single attempt, before status handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// Trait for executing a single HTTP attempt
///
/// Implementations classify transport failures into the crate error taxonomy:
/// a connection-level failure is `Error::Unavailable`, anything else
/// (timeout, body read failure) is `Error::Transport`. Status handling is the
/// caller's concern.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(
        &self,
        request: &UpstreamRequest,
        bearer_token: &str,
        timeout: Duration,
    ) -> Result<RawResponse>;
}

/// Production HTTP client backed by reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(
        &self,
        request: &UpstreamRequest,
        bearer_token: &str,
        timeout: Duration,
    ) -> Result<RawResponse> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            timeout_ms = timeout.as_millis() as u64,
            "upstream_request"
        );

        let mut req = self
            .client
            .request(request.method.clone(), &request.url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", bearer_token))
            .timeout(timeout);

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_transport_error)?;

        tracing::debug!(
            url = %request.url,
            status = status,
            response_len = body.len(),
            "upstream_response"
        );

        Ok(RawResponse { status, body })
    }
}

/// Map a reqwest failure into the crate taxonomy. Connection-level failures
/// are the only ones treated as "upstream unreachable".
fn classify_transport_error(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::Unavailable {
            detail: e.to_string(),
        }
    } else {
        Error::Transport {
            detail: e.to_string(),
        }
    }
}

/// Mock HTTP client for tests
///
/// Canned responses are keyed by `"{method} {url}"` and returned in FIFO
/// order, so a sequence like 503, 503, 200 against the same URL models a
/// recovering upstream. Every call is recorded for assertion.
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, Vec<Result<RawResponse>>>>,
    calls: Mutex<Vec<MockCall>>,
}

/// Record of a call made through the mock
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: String,
    pub url: String,
    pub body: Option<Value>,
    pub bearer_token: String,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for `"{method} {url}"`; multiple responses for the
    /// same key are served in FIFO order
    pub fn add_response(&self, method: Method, url: &str, response: Result<RawResponse>) {
        self.responses
            .lock()
            .expect("mock responses lock poisoned")
            .entry(format!("{} {}", method, url))
            .or_default()
            .push(response);
    }

    /// Queue a plain status/body response
    pub fn add_status(&self, method: Method, url: &str, status: u16, body: &str) {
        self.add_response(
            method,
            url,
            Ok(RawResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().expect("mock calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock poisoned").len()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(
        &self,
        request: &UpstreamRequest,
        bearer_token: &str,
        _timeout: Duration,
    ) -> Result<RawResponse> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(MockCall {
                method: request.method.to_string(),
                url: request.url.clone(),
                body: request.body.clone(),
                bearer_token: bearer_token.to_string(),
            });

        let next = {
            let mut responses = self.responses.lock().expect("mock responses lock poisoned");
            responses.get_mut(&request.key()).and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            })
        };

        next.unwrap_or_else(|| {
            Err(Error::Transport {
                detail: format!("no mock response configured for {}", request.key()),
            })
        })
    }
}
