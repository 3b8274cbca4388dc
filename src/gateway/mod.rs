//! The gateway: six logical operations against the customs API
//!
//! Each operation validates its input, builds the upstream payload from
//! defaults plus overrides, calls through the shared retrying client, and
//! returns a `Result` the HTTP layer turns into a uniform envelope. The
//! session store is held here and passed state explicitly per operation;
//! there is no process-wide state.

use crate::config::ClearwayConfig;
use crate::error::{Error, Result};
use crate::manifest::{
    build_document, build_review_hts, build_send, ManifestDefaults, ManifestForm,
    ReviewHtsRequest, DEFAULT_MBOL_NUMBER,
};
use crate::session::{CorrelationState, MemorySessionStore, SessionStore};
use crate::upstream::UpstreamClient;
use serde_json::{json, Value};
use std::sync::Arc;

/// Outcome of an HTS verification
#[derive(Debug, Clone)]
pub struct HtsReview {
    /// False iff the upstream response carried a non-empty `issues` or
    /// `errors` array
    pub valid: bool,
    /// Upstream `message`, or a fixed fallback, when invalid
    pub message: Option<String>,
    /// Full upstream body, returned alongside either way
    pub response: Value,
}

/// Fallback error message for an invalid HTS code without an upstream message
const INVALID_HTS_MESSAGE: &str = "Invalid HTS code.";

/// Synthetic confirmation when a delete succeeds with an empty body
const DELETED_MESSAGE: &str = "Manifest deleted successfully";

/// Customs manifest filing gateway
pub struct Gateway {
    upstream: UpstreamClient,
    sessions: Arc<dyn SessionStore>,
    defaults: ManifestDefaults,
}

impl Gateway {
    /// Production gateway with an in-memory session store
    pub fn new(config: &ClearwayConfig) -> Result<Self> {
        Ok(Self::with_parts(
            UpstreamClient::new(config.upstream.clone())?,
            Arc::new(MemorySessionStore::new()),
        ))
    }

    /// Gateway from explicit parts
    pub fn with_parts(upstream: UpstreamClient, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            upstream,
            sessions,
            defaults: ManifestDefaults::default(),
        }
    }

    /// Create a manifest document and record its bill-of-lading numbers in
    /// the session
    pub async fn submit_manifest(&self, session_id: &str, form: &ManifestForm) -> Result<Value> {
        let payload = build_document(form, &self.defaults)?;
        tracing::debug!(session = %session_id, payload = %payload, "submit_manifest");

        let body = self.upstream.create_document(payload).await?;

        let (mbol_number, hbol_number) = form.correlation_identifiers();
        tracing::info!(
            session = %session_id,
            mbol = %mbol_number,
            hbol = %hbol_number,
            "manifest_submitted"
        );
        self.sessions
            .set(
                session_id,
                CorrelationState {
                    mbol_number,
                    hbol_number,
                },
            )
            .await;

        Ok(body)
    }

    /// Verify an HTS code against the session's master bill
    pub async fn review_hts(
        &self,
        session_id: &str,
        request: &ReviewHtsRequest,
    ) -> Result<HtsReview> {
        let hts_number = request
            .hts_number
            .as_deref()
            .filter(|hts| !hts.is_empty())
            .ok_or_else(|| Error::Validation("HTS Number is required.".to_string()))?;

        let mbol_number = self.mbol_or_default(session_id).await;
        let payload = build_review_hts(&mbol_number, hts_number, request.description.as_deref());
        tracing::debug!(session = %session_id, payload = %payload, "review_hts");

        let response = self.upstream.review_hts(payload).await?;

        // Any entry in either array marks the code invalid; no severity
        // distinction is made.
        let valid = array_is_empty(&response, "issues") && array_is_empty(&response, "errors");
        let message = if valid {
            None
        } else {
            Some(
                response
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(INVALID_HTS_MESSAGE)
                    .to_string(),
            )
        };

        Ok(HtsReview {
            valid,
            message,
            response,
        })
    }

    /// Delete the session's manifest; an empty upstream body still counts as
    /// success and yields a synthetic confirmation
    pub async fn delete_manifest(&self, session_id: &str) -> Result<Value> {
        let mbol_number = self.mbol_or_default(session_id).await;
        tracing::debug!(session = %session_id, mbol = %mbol_number, "delete_manifest");

        let response = self.upstream.delete_document(&mbol_number).await?;
        if response.body.trim().is_empty() {
            return Ok(json!({ "message": DELETED_MESSAGE }));
        }
        serde_json::from_str(&response.body).map_err(Error::from)
    }

    /// Retrieve the session's manifest over the fixed date range
    pub async fn view_manifest(&self, session_id: &str) -> Result<Value> {
        let mbol_number = self.mbol_or_default(session_id).await;
        tracing::debug!(session = %session_id, mbol = %mbol_number, "view_manifest");
        self.upstream.view_documents(&mbol_number).await
    }

    /// File the session's manifest; requires a prior submit in this session
    pub async fn send_manifest(&self, session_id: &str) -> Result<Value> {
        let state = self.sessions.get(session_id).await.ok_or_else(|| {
            Error::Validation("Missing MBOLNumber or HBOLNumber in session.".to_string())
        })?;

        let payload = build_send(&state.mbol_number, &state.hbol_number);
        tracing::debug!(session = %session_id, payload = %payload, "send_manifest");
        self.upstream.send_manifest(payload).await
    }

    /// List all manifests, no session input
    pub async fn get_manifests(&self) -> Result<Value> {
        self.upstream.list_documents().await
    }

    /// The session's master bill number the page-level operations key on,
    /// if a submit has happened in this session
    pub async fn session_mbol(&self, session_id: &str) -> Option<String> {
        self.sessions
            .get(session_id)
            .await
            .map(|state| state.mbol_number)
    }

    async fn mbol_or_default(&self, session_id: &str) -> String {
        self.session_mbol(session_id)
            .await
            .unwrap_or_else(|| DEFAULT_MBOL_NUMBER.to_string())
    }
}

/// True when the named field is absent, null, or an empty array
fn array_is_empty(value: &Value, field: &str) -> bool {
    match value.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::Array(entries)) => entries.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, UpstreamConfig};
    use crate::manifest::DEFAULT_HBOL_NUMBER;
    use crate::upstream::MockHttpClient;
    use reqwest::Method;

    const DOCUMENTS: &str = "https://api.test/api/documents";
    const SEND: &str = "https://api.test/api/send";
    const REVIEW_HTS: &str = "https://api.test/api/review-hts";

    fn gateway_with(mock: Arc<MockHttpClient>) -> (Gateway, Arc<MemorySessionStore>) {
        let config = UpstreamConfig {
            base_url: "https://api.test/api".to_string(),
            retry: RetryConfig {
                backoff_ms: 0,
                ..RetryConfig::default()
            },
            ..UpstreamConfig::default()
        };
        let sessions = Arc::new(MemorySessionStore::new());
        let upstream = UpstreamClient::with_client(mock, config, "test-token");
        (
            Gateway::with_parts(upstream, sessions.clone()),
            sessions,
        )
    }

    #[tokio::test]
    async fn test_submit_stores_correlation_state() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::POST, DOCUMENTS, 200, r#"{"id": "doc-1"}"#);

        let (gateway, sessions) = gateway_with(mock.clone());
        let form = ManifestForm {
            mbol_number: Some("MBOL777".to_string()),
            hbol_number: Some("HBOL888".to_string()),
            ..ManifestForm::default()
        };

        let body = gateway.submit_manifest("s1", &form).await.unwrap();
        assert_eq!(body["id"], "doc-1");

        let state = sessions.get("s1").await.unwrap();
        assert_eq!(state.mbol_number, "MBOL777");
        assert_eq!(state.hbol_number, "HBOL888");

        // The built payload reached the wire with the override applied
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        let sent = calls[0].body.as_ref().unwrap();
        assert_eq!(sent["body"][0]["MBOLNumber"], "MBOL777");
    }

    #[tokio::test]
    async fn test_submit_defaults_correlation_state() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::POST, DOCUMENTS, 200, "{}");

        let (gateway, sessions) = gateway_with(mock);
        gateway
            .submit_manifest("s1", &ManifestForm::default())
            .await
            .unwrap();

        let state = sessions.get("s1").await.unwrap();
        assert_eq!(state.mbol_number, DEFAULT_MBOL_NUMBER);
        assert_eq!(state.hbol_number, DEFAULT_HBOL_NUMBER);
    }

    #[tokio::test]
    async fn test_submit_invalid_send_as_makes_no_call() {
        let mock = Arc::new(MockHttpClient::new());
        let (gateway, sessions) = gateway_with(mock.clone());

        let form = ManifestForm {
            send_as: Some("archive".to_string()),
            ..ManifestForm::default()
        };
        let err = gateway.submit_manifest("s1", &form).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.call_count(), 0);
        assert!(sessions.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_submit_connect_failure_is_unavailable() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_response(
            Method::POST,
            DOCUMENTS,
            Err(Error::Unavailable {
                detail: "connection refused".to_string(),
            }),
        );

        let (gateway, sessions) = gateway_with(mock);
        let err = gateway
            .submit_manifest("s1", &ManifestForm::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unavailable { .. }));
        // No correlation state on failure
        assert!(sessions.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_review_requires_hts_number() {
        let mock = Arc::new(MockHttpClient::new());
        let (gateway, _) = gateway_with(mock.clone());

        for request in [
            ReviewHtsRequest::default(),
            ReviewHtsRequest {
                hts_number: Some(String::new()),
                description: None,
            },
        ] {
            let err = gateway.review_hts("s1", &request).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            assert_eq!(err.to_string(), "HTS Number is required.");
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_review_valid_when_no_issues() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(
            Method::POST,
            REVIEW_HTS,
            200,
            r#"{"issues": [], "errors": []}"#,
        );

        let (gateway, _) = gateway_with(mock.clone());
        let request = ReviewHtsRequest {
            hts_number: Some("2903992000".to_string()),
            description: None,
        };
        let review = gateway.review_hts("s1", &request).await.unwrap();

        assert!(review.valid);
        assert!(review.message.is_none());

        // No submit happened, so the payload carries the fallback MBOL
        let sent = mock.calls()[0].body.clone().unwrap();
        assert_eq!(sent["MBOLNumber"], DEFAULT_MBOL_NUMBER);
        assert_eq!(sent["htsNumbers"], json!(["2903992000"]));
    }

    #[tokio::test]
    async fn test_review_valid_when_arrays_absent() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::POST, REVIEW_HTS, 200, r#"{"result": "ok"}"#);

        let (gateway, _) = gateway_with(mock);
        let request = ReviewHtsRequest {
            hts_number: Some("2903992000".to_string()),
            description: None,
        };
        assert!(gateway.review_hts("s1", &request).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_review_invalid_uses_upstream_message() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(
            Method::POST,
            REVIEW_HTS,
            200,
            r#"{"issues": [{"code": "HTS-1"}], "message": "HTS code retired"}"#,
        );

        let (gateway, _) = gateway_with(mock);
        let request = ReviewHtsRequest {
            hts_number: Some("0000000000".to_string()),
            description: None,
        };
        let review = gateway.review_hts("s1", &request).await.unwrap();

        assert!(!review.valid);
        assert_eq!(review.message.as_deref(), Some("HTS code retired"));
        assert_eq!(review.response["issues"][0]["code"], "HTS-1");
    }

    #[tokio::test]
    async fn test_review_invalid_falls_back_to_fixed_message() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::POST, REVIEW_HTS, 200, r#"{"errors": ["E1"]}"#);

        let (gateway, _) = gateway_with(mock);
        let request = ReviewHtsRequest {
            hts_number: Some("0000000000".to_string()),
            description: None,
        };
        let review = gateway.review_hts("s1", &request).await.unwrap();

        assert!(!review.valid);
        assert_eq!(review.message.as_deref(), Some(INVALID_HTS_MESSAGE));
    }

    #[tokio::test]
    async fn test_delete_empty_body_synthesizes_confirmation() {
        let mock = Arc::new(MockHttpClient::new());
        let url = format!("{}?type=ABIType86&MBOLNumber={}", DOCUMENTS, DEFAULT_MBOL_NUMBER);
        mock.add_status(Method::DELETE, &url, 200, "");

        let (gateway, _) = gateway_with(mock);
        let body = gateway.delete_manifest("s1").await.unwrap();
        assert_eq!(body["message"], DELETED_MESSAGE);
    }

    #[tokio::test]
    async fn test_delete_with_body_returns_it() {
        let mock = Arc::new(MockHttpClient::new());
        let url = format!("{}?type=ABIType86&MBOLNumber=MBOL777", DOCUMENTS);
        mock.add_status(Method::DELETE, &url, 200, r#"{"deleted": 1}"#);

        let (gateway, sessions) = gateway_with(mock);
        sessions
            .set(
                "s1",
                CorrelationState {
                    mbol_number: "MBOL777".to_string(),
                    hbol_number: "HBOL888".to_string(),
                },
            )
            .await;

        let body = gateway.delete_manifest("s1").await.unwrap();
        assert_eq!(body["deleted"], 1);
    }

    #[tokio::test]
    async fn test_send_without_submit_is_validation_error() {
        let mock = Arc::new(MockHttpClient::new());
        let (gateway, _) = gateway_with(mock.clone());

        let err = gateway.send_manifest("s1").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Missing MBOLNumber or HBOLNumber in session."
        );
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_send_uses_session_identifiers() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::POST, SEND, 200, r#"{"queued": true}"#);

        let (gateway, sessions) = gateway_with(mock.clone());
        sessions
            .set(
                "s1",
                CorrelationState {
                    mbol_number: "MBOL777".to_string(),
                    hbol_number: "HBOL888".to_string(),
                },
            )
            .await;

        let body = gateway.send_manifest("s1").await.unwrap();
        assert_eq!(body["queued"], true);

        let sent = mock.calls()[0].body.clone().unwrap();
        assert_eq!(sent["MBOLNumber"], "MBOL777");
        assert_eq!(sent["HBOLNumber"], json!(["HBOL888"]));
        assert_eq!(sent["sendAllHBOLS"], false);
    }

    #[tokio::test]
    async fn test_get_manifests_verbatim() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_status(Method::GET, DOCUMENTS, 200, r#"{"documents": [{"id": 1}]}"#);

        let (gateway, _) = gateway_with(mock);
        let body = gateway.get_manifests().await.unwrap();
        assert_eq!(body["documents"][0]["id"], 1);
    }

    #[test]
    fn test_array_is_empty() {
        let value = json!({"issues": [], "errors": ["E1"], "other": "x"});
        assert!(array_is_empty(&value, "issues"));
        assert!(!array_is_empty(&value, "errors"));
        assert!(array_is_empty(&value, "missing"));
        assert!(array_is_empty(&json!({"issues": null}), "issues"));
        assert!(!array_is_empty(&value, "other"));
    }
}
