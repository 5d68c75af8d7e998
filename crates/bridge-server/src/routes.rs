//! HTTP handlers: auth endpoints, health/version, and the proxy fallback.

use axum::{
    Json,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use bridge_auth::{AuthSession, SESSION_COOKIE};
use bridge_proxy::{ProxyError, cookie_value};

use crate::error::ServerError;
use crate::state::AppState;

pub const AUTH_LOGIN_ENDPOINT: &str = "/auth/login";
pub const AUTH_CALLBACK_ENDPOINT: &str = "/auth/callback";
pub const AUTH_LOGOUT_ENDPOINT: &str = "/auth/logout";

/// Where the browser lands after a failed login attempt.
pub const AUTH_ERROR_URL: &str = "/error";

/// Default landing page after a successful login.
pub const AUTH_SUCCESS_URL: &str = "/";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Path to return to after the callback completes.
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Error relayed by the identity provider.
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /auth/login` — persist a fresh login state and redirect the
/// browser to the identity provider. Sets no cookie yet.
pub async fn login_handler(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let Some(auther) = &state.auther else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let return_path = query.redirect.as_deref().unwrap_or(AUTH_SUCCESS_URL);
    let url = auther.begin_login(return_path).await;
    Redirect::temporary(&url).into_response()
}

/// `GET /auth/callback` — redeem the provider callback for a session.
///
/// Every failure redirects to the error page; a session is only ever
/// issued on the fully validated path.
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(auther) = &state.auther else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(provider_error) = &query.error {
        warn!(error = %provider_error, "identity provider returned an error");
        return Redirect::temporary(AUTH_ERROR_URL).into_response();
    }

    let (code, csrf_state) = match (&query.code, &query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => {
            warn!("callback missing code or state parameter");
            return Redirect::temporary(AUTH_ERROR_URL).into_response();
        }
    };

    match auther.finish_login(code, csrf_state).await {
        Ok((session, return_path)) => {
            let cookie = session_cookie(&state, &session);
            ([(header::SET_COOKIE, cookie)], Redirect::temporary(&return_path)).into_response()
        }
        Err(err) => {
            warn!(error = %err, "login callback failed");
            Redirect::temporary(AUTH_ERROR_URL).into_response()
        }
    }
}

/// `POST /auth/logout` — destroy the session and clear the cookie.
pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(auther) = &state.auther else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(session_id) = cookie_value(&headers, SESSION_COOKIE) {
        auther.logout(&session_id).await;
    }

    let expired = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired)],
    )
        .into_response()
}

/// `GET /health`
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "bridge"
    }))
}

/// `GET /version`
pub async fn version_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.config.version
    }))
}

/// Fallback handler: dispatch everything else through the route table.
pub async fn proxy_handler(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, ServerError> {
    let path = req.uri().path().to_string();
    let route = state
        .routes
        .route(&path)
        .ok_or_else(|| ProxyError::RouteNotFound(path))?;

    let response = bridge_proxy::forward(route, req).await?;
    Ok(response)
}

/// Build the session cookie set on a successful callback: HTTP-only,
/// host-scoped, lifetime capped by the identity token's own expiry, and
/// `Secure` whenever the external host is served over https.
fn session_cookie(state: &AppState, session: &AuthSession) -> String {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.session_id, max_age
    );
    if state.config.host.scheme() == "https" {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use bridge_auth::SessionStore;
    use bridge_proxy::RouteTable;
    use chrono::TimeDelta;

    fn test_state(host: &str) -> AppState {
        let config = GatewayConfig::new(
            "http://0.0.0.0:9000".parse().unwrap(),
            host.parse().unwrap(),
            "https://cluster.example.com".parse().unwrap(),
        );
        AppState::new(config, RouteTable::default(), SessionStore::new(), None)
    }

    fn test_session() -> AuthSession {
        let now = Utc::now();
        AuthSession {
            session_id: "sid-1".to_string(),
            issued_at: now,
            expires_at: now + TimeDelta::seconds(3600),
            subject: "user".to_string(),
            id_token: "token".to_string(),
            refresh_token: None,
        }
    }

    #[test]
    fn test_session_cookie_http_host() {
        let cookie = session_cookie(&test_state("http://127.0.0.1:9000"), &test_session());
        assert!(cookie.starts_with("bridge-session=sid-1; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_https_host_is_secure() {
        let cookie = session_cookie(&test_state("https://console.example.com"), &test_session());
        assert!(cookie.contains("; Secure"));
    }

    #[test]
    fn test_session_cookie_max_age_never_negative() {
        let mut session = test_session();
        session.expires_at = Utc::now() - TimeDelta::seconds(10);
        let cookie = session_cookie(&test_state("http://127.0.0.1:9000"), &session);
        assert!(cookie.contains("Max-Age=0"));
    }
}
