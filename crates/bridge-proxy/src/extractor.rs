//! Strategies for deriving the outbound bearer credential of a proxied request.
//!
//! No extractor ever relays an inbound `Authorization` header: the gateway
//! intermediates trust between the browser and the backends, it does not
//! pass it through.

use axum::http::{HeaderMap, header};
use bridge_auth::SessionStore;

/// A credential-sourcing strategy attached to a backend route.
///
/// Adding a strategy means adding a variant and a matching `extract` case.
#[derive(Clone)]
pub enum TokenExtractor {
    /// A fixed service credential, used when the gateway runs with
    /// in-cluster identity or authentication disabled.
    Constant(String),
    /// Per-user credential resolved from the gateway's session cookie.
    SessionCookie {
        cookie_name: String,
        store: SessionStore,
    },
}

impl TokenExtractor {
    pub fn constant(token: impl Into<String>) -> Self {
        Self::Constant(token.into())
    }

    pub fn session_cookie(store: SessionStore) -> Self {
        Self::SessionCookie {
            cookie_name: bridge_auth::SESSION_COOKIE.to_string(),
            store,
        }
    }

    /// Derive the outbound token for a request, or `None` when no usable
    /// credential exists. Callers must then reject the request rather
    /// than forward it unauthenticated.
    pub async fn extract(&self, headers: &HeaderMap) -> Option<String> {
        match self {
            Self::Constant(token) => {
                if token.is_empty() {
                    None
                } else {
                    Some(token.clone())
                }
            }
            Self::SessionCookie { cookie_name, store } => {
                let session_id = cookie_value(headers, cookie_name)?;
                let session = store.get_session(&session_id).await?;
                Some(session.id_token)
            }
        }
    }
}

impl std::fmt::Debug for TokenExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(_) => f.write_str("TokenExtractor::Constant(<redacted>)"),
            Self::SessionCookie { cookie_name, .. } => f
                .debug_struct("TokenExtractor::SessionCookie")
                .field("cookie_name", cookie_name)
                .finish_non_exhaustive(),
        }
    }
}

/// Read a named cookie from the request's `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == name && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
