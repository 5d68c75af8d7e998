//! HTTP gateway server for the console bridge.
//!
//! Composes the certificate trust manager, backend route table, OIDC
//! authenticator, and session store behind one listener: requests to the
//! auth endpoints drive the login flow, everything else is dispatched
//! through the reverse proxy.
//!
//! # Example
//!
//! ```ignore
//! use bridge_server::{GatewayConfig, Server};
//!
//! let config = GatewayConfig::new(listen, host, cluster_endpoint)
//!     .with_oidc(client_id, client_secret, issuer_url);
//! let server = Server::build(config).await?;
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{ConfigError, GatewayConfig};
pub use error::{ErrorResponse, Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bridge_auth::{Authenticator, OidcConfig, SessionStore};
use bridge_proxy::TrustConfig;

use crate::config::DEFAULT_IDP_TIMEOUT;
use crate::routes::{
    AUTH_CALLBACK_ENDPOINT, AUTH_LOGIN_ENDPOINT, AUTH_LOGOUT_ENDPOINT,
};

/// The gateway server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Validate the configuration and assemble the gateway: trust
    /// manager, route table, session store, and (unless disabled) the
    /// OIDC authenticator, which performs provider discovery here.
    ///
    /// Every failure on this path is fatal; the server never starts
    /// serving traffic with a partially built state.
    pub async fn build(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let store = SessionStore::new();
        let routes = config.build_route_table(&store)?;

        let auther = if config.disable_auth {
            warn!("running with AUTHENTICATION DISABLED");
            None
        } else {
            let trust = TrustConfig::from_optional_pem_file(config.ca_file.as_deref())
                .map_err(ServerError::Proxy)?;
            let idp_client = trust
                .build_client(DEFAULT_IDP_TIMEOUT)
                .map_err(ServerError::Proxy)?;

            // validate() guarantees these are present when auth is enabled.
            let oidc = OidcConfig::new(
                config.client_id.clone().unwrap_or_default(),
                config.client_secret.clone().unwrap_or_default(),
                config
                    .issuer_url
                    .as_ref()
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
                config.callback_url().to_string(),
            );

            Some(Authenticator::new(oidc, idp_client, store.clone()).await?)
        };

        Ok(Self {
            state: AppState::new(config, routes, store, auther),
        })
    }

    /// Build a server from a pre-assembled state (tests).
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router: auth endpoints (only when authentication is
    /// enabled), health/version, and the proxy dispatch as the fallback.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(routes::health_handler))
            .route("/version", get(routes::version_handler));

        if self.state.auth_enabled() {
            router = router
                .route(AUTH_LOGIN_ENDPOINT, get(routes::login_handler))
                .route(AUTH_CALLBACK_ENDPOINT, get(routes::callback_handler))
                .route(AUTH_LOGOUT_ENDPOINT, post(routes::logout_handler));
        }

        router
            .fallback(routes::proxy_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server, terminating TLS when the listen URL is https.
    pub async fn run(self) -> Result<()> {
        let addr = self.listen_addr()?;
        let config = self.state.config.clone();

        self.state
            .store
            .spawn_sweeper(bridge_auth::store::DEFAULT_SWEEP_INTERVAL);

        let router = self.router();

        if config.listen.scheme() == "https" {
            let (cert, key) = match (&config.tls_cert_file, &config.tls_key_file) {
                (Some(cert), Some(key)) => (cert.clone(), key.clone()),
                // validate() rejects https without cert and key.
                _ => {
                    return Err(ServerError::Internal(
                        "https listen without TLS material".to_string(),
                    ));
                }
            };

            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(|e| ServerError::Internal(format!("could not load TLS material: {}", e)))?;

            info!(%addr, "binding with TLS");
            axum_server::bind_rustls(addr, tls)
                .serve(router.into_make_service())
                .await
                .map_err(|e| ServerError::Internal(format!("server error: {}", e)))
        } else {
            info!(%addr, "binding without TLS");
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| ServerError::Internal(format!("failed to bind: {}", e)))?;

            axum::serve(listener, router)
                .await
                .map_err(|e| ServerError::Internal(format!("server error: {}", e)))
        }
    }

    fn listen_addr(&self) -> Result<SocketAddr> {
        let listen = &self.state.config.listen;
        let host = listen.host_str().unwrap_or("0.0.0.0");
        let port = listen.port_or_known_default().unwrap_or(80);

        format!("{}:{}", host, port).parse().map_err(|e| {
            ServerError::Internal(format!("invalid listen address {}: {}", listen, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bridge_proxy::RouteTable;
    use tower::ServiceExt;

    fn test_server() -> Server {
        let config = GatewayConfig::new(
            "http://0.0.0.0:9000".parse().unwrap(),
            "http://127.0.0.1:9000".parse().unwrap(),
            "https://cluster.example.com".parse().unwrap(),
        )
        .with_version("1.2.3");
        Server::from_state(AppState::new(
            config,
            RouteTable::default(),
            SessionStore::new(),
            None,
        ))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let response = test_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["version"], "1.2.3");
    }

    #[tokio::test]
    async fn test_auth_routes_absent_when_auth_disabled() {
        // With no authenticator the auth paths fall through to the proxy,
        // which has no matching route.
        let response = test_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/auth/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unrouted_path_is_not_found() {
        let response = test_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/pods")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
