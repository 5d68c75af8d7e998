//! OIDC authorization-code grant: discovery, authorization URL, code exchange.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Deserialize;

use crate::error::{AuthError, Result};

/// Default scopes requested from the identity provider.
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";

/// OIDC client configuration.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub client_id: String,
    pub client_secret: String,
    pub issuer_url: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl OidcConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        issuer_url: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            issuer_url: issuer_url.into(),
            redirect_uri: redirect_uri.into(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// Endpoints advertised by the identity provider's discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

/// Fetch the provider's discovery document from the issuer URL.
pub async fn discover(client: &reqwest::Client, issuer_url: &str) -> Result<ProviderMetadata> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        issuer_url.trim_end_matches('/')
    );

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AuthError::Discovery(format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AuthError::Discovery(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| AuthError::Discovery(format!("invalid discovery document: {}", e)))?;

    if metadata.authorization_endpoint.is_empty()
        || metadata.token_endpoint.is_empty()
        || metadata.jwks_uri.is_empty()
    {
        return Err(AuthError::Discovery(
            "discovery document is missing required endpoints".to_string(),
        ));
    }

    Ok(metadata)
}

/// Generate a random url-safe value for CSRF state and session identifiers.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL the browser is redirected to.
pub fn build_authorization_url(
    config: &OidcConfig,
    metadata: &ProviderMetadata,
    state: &str,
) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", config.scope.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", metadata.authorization_endpoint, query)
}

/// Tokens returned from the code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Exchange an authorization code for tokens at the provider's token endpoint.
///
/// Any transport or protocol failure is terminal for the attempt; the code
/// is single-use and the exchange is never retried.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OidcConfig,
    metadata: &ProviderMetadata,
    code: &str,
) -> Result<TokenResponse> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    let response = client
        .post(&metadata.token_endpoint)
        .form(&params)
        .send()
        .await
        .map_err(|e| AuthError::ExchangeFailed(format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(AuthError::ExchangeFailed(format!("{}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::ExchangeFailed(format!("invalid token response: {}", e)))
}
