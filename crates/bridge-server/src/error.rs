//! Error types for the gateway server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use bridge_auth::AuthError;
use bridge_proxy::ProxyError;

use crate::config::ConfigError;

/// Gateway server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Login/callback failure. Handlers normally redirect these to the
    /// error page; surfacing directly yields 401.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Proxy dispatch or forwarding failure.
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// Startup configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
            ServerError::Proxy(ProxyError::RouteNotFound(_)) => {
                (StatusCode::NOT_FOUND, "route_not_found")
            }
            ServerError::Proxy(ProxyError::AuthenticationRequired) => {
                (StatusCode::UNAUTHORIZED, "authentication_required")
            }
            ServerError::Proxy(ProxyError::BackendUnavailable(_)) => {
                (StatusCode::BAD_GATEWAY, "backend_unavailable")
            }
            ServerError::Proxy(ProxyError::Config(_)) | ServerError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error")
            }
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();

        match &self {
            // Unrouted paths are a client mistake, not a system fault.
            ServerError::Proxy(ProxyError::RouteNotFound(_)) => {
                tracing::debug!(status = %status, code, error = %message, "client error");
            }
            ServerError::Auth(_) | ServerError::Proxy(ProxyError::AuthenticationRequired) => {
                tracing::warn!(status = %status, code, error = %message, "client error");
            }
            _ => {
                tracing::error!(status = %status, code, error = %message, "server error");
            }
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
