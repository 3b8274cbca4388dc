//! Session-scoped correlation state
//!
//! A successful submit records the manifest's master and house bill-of-lading
//! numbers; later delete/view/send operations read them back within the same
//! logical session. The store is passed into the gateway explicitly and sits
//! behind a trait so the in-memory implementation can be swapped for a shared
//! one.

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Bill-of-lading identifiers correlated across operations within a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationState {
    /// Master bill-of-lading number
    pub mbol_number: String,
    /// House bill-of-lading number
    pub hbol_number: String,
}

/// Key-value store for per-session correlation state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Correlation state for a session, if a submit has happened in it
    async fn get(&self, session_id: &str) -> Option<CorrelationState>;

    /// Record correlation state for a session
    async fn set(&self, session_id: &str, state: CorrelationState);
}

struct SessionEntry {
    state: CorrelationState,
    last_activity: i64,
}

/// In-memory session store
///
/// State expires with the process; entries idle past the configured lifetime
/// are dropped by [`MemorySessionStore::cleanup_inactive`].
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of sessions currently holding correlation state
    pub async fn session_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop sessions idle for longer than `max_idle_ms`; returns the number
    /// removed
    pub async fn cleanup_inactive(&self, max_idle_ms: i64) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.last_activity <= max_idle_ms);
        let cleaned = before - entries.len();
        if cleaned > 0 {
            tracing::info!(cleaned = cleaned, "session_cleanup");
        }
        cleaned
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<CorrelationState> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(session_id)?;
        entry.last_activity = chrono::Utc::now().timestamp_millis();
        Some(entry.state.clone())
    }

    async fn set(&self, session_id: &str, state: CorrelationState) {
        let mut entries = self.entries.write().await;
        entries.insert(
            session_id.to_string(),
            SessionEntry {
                state,
                last_activity: chrono::Utc::now().timestamp_millis(),
            },
        );
    }
}

/// Session identifier extracted from (or assigned by) the cookie middleware
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Cookie middleware: reads the session cookie, assigning a fresh UUID and a
/// `Set-Cookie` header when the request carries none. Handlers pick the id up
/// from request extensions.
pub async fn session_middleware(cookie_name: String, mut req: Request, next: Next) -> Response {
    let existing = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| find_cookie(cookies, &cookie_name));

    let (session_id, is_new) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    req.extensions_mut().insert(SessionId(session_id.clone()));

    let mut response = next.run(req).await;

    if is_new {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            cookie_name, session_id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn find_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            Some(value.to_string())
        } else {
            None
        }
    })
}
