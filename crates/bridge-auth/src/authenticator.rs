//! The OIDC authenticator: login initiation, callback handling, session issuance.
//!
//! The browser-redirect-driven handshake is modeled as a state machine keyed
//! by the persisted [`LoginState`] and [`AuthSession`] records, so the flow
//! is resumable across independent requests:
//!
//! ```text
//! begin_login:  Idle -> LoginInitiated        (state persisted, browser redirected)
//! finish_login: CallbackPending -> Authenticated | Failed
//! ```

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AuthError, Result};
use crate::oidc::{self, OidcConfig, ProviderMetadata};
use crate::store::{AuthSession, LoginState, SessionStore};
use crate::verify::{self, Jwks};

/// Name of the gateway's session cookie.
pub const SESSION_COOKIE: &str = "bridge-session";

/// Owns the authorization-code-grant flow against one identity provider.
pub struct Authenticator {
    config: OidcConfig,
    metadata: ProviderMetadata,
    keys: RwLock<Jwks>,
    http: reqwest::Client,
    store: SessionStore,
}

impl Authenticator {
    /// Discover the provider and fetch its key set.
    ///
    /// Both failures are fatal: the gateway must not start serving login
    /// traffic without a validated provider configuration.
    pub async fn new(config: OidcConfig, http: reqwest::Client, store: SessionStore) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(AuthError::Config(
                "client id and secret are required".to_string(),
            ));
        }

        let metadata = oidc::discover(&http, &config.issuer_url).await?;
        let keys = verify::fetch_jwks(&http, &metadata.jwks_uri).await?;

        info!(issuer = %metadata.issuer, "OIDC provider discovered");

        Ok(Self {
            config,
            metadata,
            keys: RwLock::new(keys),
            http,
            store,
        })
    }

    /// Begin a login attempt: persist a fresh anti-CSRF state and return
    /// the provider URL to redirect the browser to.
    pub async fn begin_login(&self, return_path: &str) -> String {
        let state = oidc::generate_state();
        self.store
            .put_login(LoginState {
                state_value: state.clone(),
                created_at: Utc::now(),
                return_path: sanitize_return_path(return_path),
            })
            .await;

        debug!("login initiated");
        oidc::build_authorization_url(&self.config, &self.metadata, &state)
    }

    /// Handle the provider callback: consume the state, exchange the code,
    /// validate the identity token, and issue a session.
    ///
    /// Returns the new session and the return path stored at login time.
    pub async fn finish_login(&self, code: &str, state: &str) -> Result<(AuthSession, String)> {
        let login = self
            .store
            .consume_login(state)
            .await
            .ok_or(AuthError::InvalidState)?;

        let tokens = oidc::exchange_code(&self.http, &self.config, &self.metadata, code).await?;
        let claims = self.validate_id_token(&tokens.id_token).await?;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::InvalidToken("unrepresentable expiry".to_string()))?;

        let session = AuthSession {
            session_id: oidc::generate_state(),
            issued_at: Utc::now(),
            expires_at,
            subject: claims.sub.clone(),
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
        };
        self.store.put_session(session.clone()).await;

        info!(subject = %claims.sub, "session issued");
        Ok((session, login.return_path))
    }

    /// Destroy a session. Returns whether a live session existed.
    pub async fn logout(&self, session_id: &str) -> bool {
        self.store.remove_session(session_id).await.is_some()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Validate against the cached key set, refetching once if the token
    /// references a key we do not hold (signing-key rotation).
    async fn validate_id_token(&self, token: &str) -> Result<verify::IdTokenClaims> {
        {
            let keys = self.keys.read().await;
            if verify::has_key_for(&keys, token) {
                return verify::verify_id_token(
                    &keys,
                    token,
                    &self.metadata.issuer,
                    &self.config.client_id,
                );
            }
        }

        let fresh = verify::fetch_jwks(&self.http, &self.metadata.jwks_uri).await?;
        let claims = verify::verify_id_token(
            &fresh,
            token,
            &self.metadata.issuer,
            &self.config.client_id,
        )?;
        *self.keys.write().await = fresh;
        Ok(claims)
    }
}

/// Keep return paths on this origin: anything that is not a plain absolute
/// path collapses to the landing page.
fn sanitize_return_path(path: &str) -> String {
    if path.starts_with('/') && !path.starts_with("//") {
        path.to_string()
    } else {
        "/".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_return_path() {
        assert_eq!(sanitize_return_path("/pods"), "/pods");
        assert_eq!(sanitize_return_path("/"), "/");
        assert_eq!(sanitize_return_path("//evil.example.com"), "/");
        assert_eq!(sanitize_return_path("https://evil.example.com"), "/");
        assert_eq!(sanitize_return_path(""), "/");
    }
}
