//! OIDC authorization-code flow and session store for the console bridge.
//!
//! Authenticates end users against an identity provider and issues cookie
//! sessions that the proxy layer redeems for outbound bearer credentials.
//!
//! # Components
//!
//! - [`oidc`] — provider discovery, authorization URL, code exchange
//! - [`verify`] — identity-token validation against the provider's key set
//! - [`store`] — concurrency-safe login-state and session store with expiry
//! - [`authenticator`] — the flow itself: login initiation, callback, session issuance

pub mod authenticator;
pub mod error;
pub mod oidc;
pub mod store;
pub mod verify;

pub use authenticator::{Authenticator, SESSION_COOKIE};
pub use error::{AuthError, Result};
pub use oidc::{OidcConfig, ProviderMetadata, TokenResponse};
pub use store::{AuthSession, LoginState, SessionStore};
pub use verify::{IdTokenClaims, Jwks};
