//! Error types for the reverse proxy.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur while dispatching a proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No configured backend route matches the request path. A client
    /// error, not a system fault.
    #[error("no route matches {0}")]
    RouteNotFound(String),

    /// The route's token extractor yielded no usable credential. The
    /// request is never forwarded upstream unauthenticated.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Network, timeout, or TLS failure talking to the backend. Reported,
    /// not retried: proxied requests may not be idempotent.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Malformed route or trust configuration. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),
}
