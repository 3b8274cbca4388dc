//! Shared retrying client for the customs API
//!
//! Every outbound operation goes through [`UpstreamClient::call`]: a bounded
//! retry loop over a single [`HttpClient`] attempt, retrying only on the
//! configured status set with escalating backoff. Failing statuses are
//! normalized into `Error::UpstreamStatus` carrying the parsed error body.

use super::http::{HttpClient, RawResponse, ReqwestHttpClient, UpstreamRequest};
use crate::config::UpstreamConfig;
use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

/// Document type query parameter for delete/view
const DOCUMENT_TYPE: &str = "ABIType86";

/// Fixed date-range query parameters for the view operation
const VIEW_DATE_FROM: &str = "2025-04-14";
const VIEW_DATE_TO: &str = "2025-04-14";

/// Retrying, error-normalizing client shared by all gateway operations
pub struct UpstreamClient {
    http: Arc<dyn HttpClient>,
    config: UpstreamConfig,
    bearer_token: String,
}

impl UpstreamClient {
    /// Production client; resolves the bearer token from the environment
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let bearer_token = config.resolve_token()?;
        Ok(Self {
            http: Arc::new(ReqwestHttpClient::new()),
            config,
            bearer_token,
        })
    }

    /// Client with an injected transport and explicit token
    pub fn with_client(
        http: Arc<dyn HttpClient>,
        config: UpstreamConfig,
        bearer_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            config,
            bearer_token: bearer_token.into(),
        }
    }

    /// Create a manifest document (POST documents)
    pub async fn create_document(&self, payload: Value) -> Result<Value> {
        let request = UpstreamRequest::new(Method::POST, self.config.documents_url())
            .with_body(payload);
        self.call_json(request).await
    }

    /// List all manifest documents (GET documents, no query)
    pub async fn list_documents(&self) -> Result<Value> {
        let request = UpstreamRequest::new(Method::GET, self.config.documents_url());
        self.call_json(request).await
    }

    /// Retrieve manifests for one master bill over the fixed date range
    pub async fn view_documents(&self, mbol_number: &str) -> Result<Value> {
        let url = format!(
            "{}?type={}&dateFrom={}&dateTo={}&masterBOLNumber={}&skip=0",
            self.config.documents_url(),
            DOCUMENT_TYPE,
            VIEW_DATE_FROM,
            VIEW_DATE_TO,
            mbol_number
        );
        let request = UpstreamRequest::new(Method::GET, url);
        self.call_json(request).await
    }

    /// Delete a manifest by master bill (DELETE documents)
    ///
    /// Returns the raw response: the upstream may legitimately answer with an
    /// empty body, which the gateway turns into a synthetic confirmation.
    pub async fn delete_document(&self, mbol_number: &str) -> Result<RawResponse> {
        let url = format!(
            "{}?type={}&MBOLNumber={}",
            self.config.documents_url(),
            DOCUMENT_TYPE,
            mbol_number
        );
        let request = UpstreamRequest::new(Method::DELETE, url);
        self.call_checked(request).await
    }

    /// File a manifest (POST send)
    pub async fn send_manifest(&self, payload: Value) -> Result<Value> {
        let request = UpstreamRequest::new(Method::POST, self.config.send_url()).with_body(payload);
        self.call_json(request).await
    }

    /// Verify HTS codes (POST review-hts)
    pub async fn review_hts(&self, payload: Value) -> Result<Value> {
        let request =
            UpstreamRequest::new(Method::POST, self.config.review_hts_url()).with_body(payload);
        self.call_json(request).await
    }

    /// Execute with retries, then parse the successful body as JSON
    async fn call_json(&self, request: UpstreamRequest) -> Result<Value> {
        let response = self.call_checked(request).await?;
        serde_json::from_str(&response.body).map_err(Error::from)
    }

    /// Execute with retries and reject failing statuses with a normalized
    /// error body
    async fn call_checked(&self, request: UpstreamRequest) -> Result<RawResponse> {
        let response = self.call(request).await?;
        if response.status >= 400 {
            return Err(Error::UpstreamStatus {
                status: response.status,
                api_error: normalize_error_body(&response.body),
            });
        }
        Ok(response)
    }

    /// Bounded retry loop over single attempts
    ///
    /// Only responses carrying a status in the configured retry set are
    /// retried; transport failures (connection refused, timeout) and all
    /// other statuses surface immediately.
    async fn call(&self, request: UpstreamRequest) -> Result<RawResponse> {
        let retry = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            let result = self
                .http
                .execute(&request, &self.bearer_token, self.config.timeout())
                .await;

            match result {
                Ok(response)
                    if retry.should_retry(response.status) && attempt < retry.max_retries =>
                {
                    let delay = retry.backoff(attempt);
                    attempt += 1;
                    tracing::warn!(
                        url = %request.url,
                        status = response.status,
                        attempt = attempt,
                        max_retries = retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "upstream_retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::error!(url = %request.url, error = %e, "upstream_call_failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Structured error body when the upstream returned parseable JSON, otherwise
/// the raw text under a `message` field
fn normalize_error_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({ "message": body }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::upstream::http::MockHttpClient;

    fn test_config() -> UpstreamConfig {
        UpstreamConfig {
            base_url: "https://api.test/api".to_string(),
            retry: RetryConfig {
                backoff_ms: 0,
                ..RetryConfig::default()
            },
            ..UpstreamConfig::default()
        }
    }

    fn client_with(mock: Arc<MockHttpClient>) -> UpstreamClient {
        UpstreamClient::with_client(mock, test_config(), "test-token")
    }

    const DOCUMENTS: &str = "https://api.test/api/documents";

    #[tokio::test]
    async fn test_retryable_status_recovers() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::GET, DOCUMENTS, 503, "busy");
        mock.add_status(Method::GET, DOCUMENTS, 503, "busy");
        mock.add_status(Method::GET, DOCUMENTS, 200, r#"{"documents": []}"#);

        let client = client_with(mock.clone());
        let body = client.list_documents().await.unwrap();

        assert_eq!(body["documents"], serde_json::json!([]));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::GET, DOCUMENTS, 400, r#"{"message": "bad request"}"#);

        let client = client_with(mock.clone());
        let err = client.list_documents().await.unwrap_err();

        assert_eq!(mock.call_count(), 1);
        match err {
            Error::UpstreamStatus { status, api_error } => {
                assert_eq!(status, 400);
                assert_eq!(api_error["message"], "bad request");
            }
            other => panic!("expected UpstreamStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_exhausted_surfaces_last_status() {
        let mock = Arc::new(MockHttpClient::new());
        for _ in 0..4 {
            mock.add_status(Method::GET, DOCUMENTS, 503, "still busy");
        }

        let client = client_with(mock.clone());
        let err = client.list_documents().await.unwrap_err();

        // initial attempt + 3 retries
        assert_eq!(mock.call_count(), 4);
        match err {
            Error::UpstreamStatus { status, api_error } => {
                assert_eq!(status, 503);
                // unparseable body lands under "message"
                assert_eq!(api_error["message"], "still busy");
            }
            other => panic!("expected UpstreamStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_failure_not_retried() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_response(
            Method::GET,
            DOCUMENTS,
            Err(Error::Unavailable {
                detail: "connection refused".to_string(),
            }),
        );

        let client = client_with(mock.clone());
        let err = client.list_documents().await.unwrap_err();

        assert_eq!(mock.call_count(), 1);
        assert!(matches!(err, Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_delete_preserves_empty_body() {
        let mock = Arc::new(MockHttpClient::new());
        let url = format!("{}?type=ABIType86&MBOLNumber=MBOL777", DOCUMENTS);
        mock.add_status(Method::DELETE, &url, 200, "");

        let client = client_with(mock.clone());
        let response = client.delete_document("MBOL777").await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_view_url_shape() {
        let mock = Arc::new(MockHttpClient::new());
        let url = format!(
            "{}?type=ABIType86&dateFrom=2025-04-14&dateTo=2025-04-14&masterBOLNumber=MBOL777&skip=0",
            DOCUMENTS
        );
        mock.add_status(Method::GET, &url, 200, "{}");

        let client = client_with(mock.clone());
        client.view_documents("MBOL777").await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0].url, url);
        assert_eq!(calls[0].bearer_token, "test-token");
    }

    #[test]
    fn test_normalize_error_body() {
        let structured = normalize_error_body(r#"{"errors": ["E1"]}"#);
        assert_eq!(structured["errors"][0], "E1");

        let raw = normalize_error_body("<html>gateway timeout</html>");
        assert_eq!(raw["message"], "<html>gateway timeout</html>");
    }
}
