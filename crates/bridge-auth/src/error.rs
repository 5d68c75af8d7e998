//! Error types for the OIDC authenticator.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during login and callback handling.
///
/// All variants are per-request failures except [`AuthError::Discovery`]
/// and [`AuthError::Config`], which are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The callback request is missing a required query parameter.
    #[error("missing parameters: {0}")]
    MissingParameters(&'static str),

    /// The callback presented a state value that was never issued,
    /// already consumed, or past its TTL.
    #[error("invalid or expired state")]
    InvalidState,

    /// The code-for-token exchange with the identity provider failed.
    /// Terminal for the attempt: authorization codes are single-use,
    /// so the exchange is never retried.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// The identity token failed signature, issuer, audience, or
    /// expiry validation.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Provider metadata discovery failed. Fatal at startup.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Authenticator misconfiguration. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),
}
