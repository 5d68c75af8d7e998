//! Gateway configuration, validated before the core starts serving.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use bridge_auth::SessionStore;
use bridge_proxy::{BackendRoute, ProxyError, RouteTable, TokenExtractor, TrustConfig};

/// Timeout applied to every proxied backend call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout applied to identity-provider calls (discovery, JWKS, exchange).
pub const DEFAULT_IDP_TIMEOUT: Duration = Duration::from_secs(5);

/// Path prefix proxied to the cluster control-plane API.
pub const CLUSTER_API_PREFIX: &str = "/api/";

/// Path prefix proxied to the identity-management (dex) API.
pub const DEX_API_PREFIX: &str = "/api/dex/";

/// Configuration error. Fatal: the process must not start serving traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required flag: {0}")]
    MissingFlag(&'static str),

    #[error("invalid flag {flag}: {reason}")]
    InvalidFlag {
        flag: &'static str,
        reason: String,
    },
}

/// Validated startup configuration for the gateway.
///
/// Constructed once at startup and passed by reference into the server;
/// request handlers never consult ambient global state. "Auth disabled"
/// and "fixed bearer token" are explicit modes, not fallbacks.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen URL; `http` or `https` scheme.
    pub listen: Url,
    /// Externally visible base URL, used in OIDC redirect URLs and to
    /// decide whether the session cookie is marked `Secure`.
    pub host: Url,
    pub tls_cert_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,

    /// Cluster control-plane API endpoint.
    pub cluster_endpoint: Url,
    /// Fixed bearer token for cluster requests. Overrides per-user
    /// session credentials; intended for `disable_auth` deployments.
    pub cluster_bearer_token: Option<String>,
    /// Skip TLS verification of the cluster endpoint. Dev only.
    pub insecure_skip_verify_cluster: bool,

    /// Optional PEM bundle of trusted CAs for backend and provider TLS.
    pub ca_file: Option<PathBuf>,

    /// Disable all forms of authentication.
    pub disable_auth: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub issuer_url: Option<Url>,
    /// Proxy the identity provider's user-management API under
    /// [`DEX_API_PREFIX`]. Requires authentication enabled.
    pub enable_dex_user_management: bool,

    pub upstream_timeout: Duration,
    /// Version string served at `/version`.
    pub version: String,
}

impl GatewayConfig {
    pub fn new(listen: Url, host: Url, cluster_endpoint: Url) -> Self {
        Self {
            listen,
            host,
            tls_cert_file: None,
            tls_key_file: None,
            cluster_endpoint,
            cluster_bearer_token: None,
            insecure_skip_verify_cluster: false,
            ca_file: None,
            disable_auth: false,
            client_id: None,
            client_secret: None,
            issuer_url: None,
            enable_dex_user_management: false,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            version: "UNKNOWN".to_string(),
        }
    }

    pub fn with_tls(mut self, cert: PathBuf, key: PathBuf) -> Self {
        self.tls_cert_file = Some(cert);
        self.tls_key_file = Some(key);
        self
    }

    pub fn with_oidc(mut self, client_id: String, client_secret: String, issuer: Url) -> Self {
        self.client_id = Some(client_id);
        self.client_secret = Some(client_secret);
        self.issuer_url = Some(issuer);
        self
    }

    pub fn with_auth_disabled(mut self, bearer_token: Option<String>) -> Self {
        self.disable_auth = true;
        self.cluster_bearer_token = bearer_token;
        self
    }

    pub fn with_dex_user_management(mut self, enabled: bool) -> Self {
        self.enable_dex_user_management = enabled;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Validate the configuration. Any failure here halts startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.listen.scheme() {
            "http" => {}
            "https" => {
                if self.tls_cert_file.is_none() || self.tls_key_file.is_none() {
                    return Err(ConfigError::InvalidFlag {
                        flag: "listen",
                        reason: "https listen requires tls-cert-file and tls-key-file".to_string(),
                    });
                }
            }
            other => {
                return Err(ConfigError::InvalidFlag {
                    flag: "listen",
                    reason: format!("only http and https schemes are supported, got {}", other),
                });
            }
        }

        require_host(&self.listen, "listen")?;
        require_host(&self.host, "host")?;
        require_host(&self.cluster_endpoint, "k8s-endpoint")?;

        if !self.disable_auth {
            if self.client_id.as_deref().unwrap_or_default().is_empty() {
                return Err(ConfigError::MissingFlag("auth-client-id"));
            }
            if self.client_secret.as_deref().unwrap_or_default().is_empty() {
                return Err(ConfigError::MissingFlag("auth-client-secret"));
            }
            let issuer = self
                .issuer_url
                .as_ref()
                .ok_or(ConfigError::MissingFlag("auth-issuer-url"))?;
            require_host(issuer, "auth-issuer-url")?;
        }

        if self.enable_dex_user_management {
            if self.disable_auth {
                return Err(ConfigError::InvalidFlag {
                    flag: "enable-dex-user-management",
                    reason: "requires authentication enabled".to_string(),
                });
            }
            if self.issuer_url.is_none() {
                return Err(ConfigError::MissingFlag("auth-issuer-url"));
            }
        }

        if !self.disable_auth && self.cluster_bearer_token.is_some() {
            tracing::warn!(
                "k8s-bearer-token is set with authentication enabled; \
                 per-user session credentials will be overridden"
            );
        }

        Ok(())
    }

    /// Assemble the backend route table from this configuration.
    pub fn build_route_table(&self, store: &SessionStore) -> Result<RouteTable, ProxyError> {
        let trust = TrustConfig::from_optional_pem_file(self.ca_file.as_deref())?;

        let cluster_trust = if self.insecure_skip_verify_cluster {
            TrustConfig::insecure_skip_verify()
        } else {
            trust.clone()
        };

        let cluster_extractor = match &self.cluster_bearer_token {
            Some(token) => TokenExtractor::constant(token.clone()),
            None => TokenExtractor::session_cookie(store.clone()),
        };

        let mut routes = vec![BackendRoute::new(
            "cluster",
            CLUSTER_API_PREFIX,
            self.cluster_endpoint.clone(),
            &cluster_trust,
            cluster_extractor,
            self.upstream_timeout,
        )?];

        if self.enable_dex_user_management {
            let issuer = self.issuer_url.as_ref().ok_or_else(|| {
                ProxyError::Config("dex user management requires an issuer URL".to_string())
            })?;
            let mut dex_endpoint = issuer.clone();
            dex_endpoint.set_path("/api");

            routes.push(BackendRoute::new(
                "dex",
                DEX_API_PREFIX,
                dex_endpoint,
                &trust,
                TokenExtractor::session_cookie(store.clone()),
                self.upstream_timeout,
            )?);
        }

        RouteTable::new(routes)
    }

    /// The OIDC callback URL derived from the external host.
    pub fn callback_url(&self) -> Url {
        let mut url = self.host.clone();
        url.set_path(crate::routes::AUTH_CALLBACK_ENDPOINT);
        url
    }
}

fn require_host(url: &Url, flag: &'static str) -> Result<(), ConfigError> {
    if url.scheme().is_empty() || !url.has_host() {
        return Err(ConfigError::InvalidFlag {
            flag,
            reason: "malformed URL".to_string(),
        });
    }
    Ok(())
}
