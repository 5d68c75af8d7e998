//! bridge - authenticating gateway between the console and cluster backends.
//!
//! Main entry point: parses flags, validates configuration, and runs the
//! gateway server until shutdown.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;

use bridge_server::{GatewayConfig, Server};

/// Authenticating gateway between the console and cluster backends.
///
/// Every flag can also be set through the environment with a `BRIDGE_`
/// prefix, e.g. `BRIDGE_LISTEN=http://0.0.0.0:9000`.
#[derive(Parser)]
#[command(name = "bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// URL to listen on; http or https scheme
    #[arg(long, env = "BRIDGE_LISTEN", default_value = "http://0.0.0.0:9000")]
    pub listen: Url,

    /// Externally visible base URL of this gateway
    #[arg(long, env = "BRIDGE_BASE_ADDRESS", default_value = "http://127.0.0.1:9000")]
    pub base_address: Url,

    /// TLS certificate (PEM); required when listening on https
    #[arg(long, env = "BRIDGE_TLS_CERT_FILE")]
    pub tls_cert_file: Option<PathBuf>,

    /// TLS private key (PEM); required when listening on https
    #[arg(long, env = "BRIDGE_TLS_KEY_FILE")]
    pub tls_key_file: Option<PathBuf>,

    /// Cluster control-plane API endpoint
    #[arg(long, env = "BRIDGE_K8S_ENDPOINT", default_value = "https://127.0.0.1:6443")]
    pub k8s_endpoint: Url,

    /// Fixed bearer token for cluster requests; overrides session credentials
    #[arg(long, env = "BRIDGE_K8S_BEARER_TOKEN")]
    pub k8s_bearer_token: Option<String>,

    /// Skip TLS verification of the cluster endpoint (dev only)
    #[arg(long, env = "BRIDGE_K8S_INSECURE_SKIP_VERIFY")]
    pub k8s_insecure_skip_verify: bool,

    /// PEM bundle of additional trusted CAs for backend and provider TLS
    #[arg(long, env = "BRIDGE_CA_FILE")]
    pub ca_file: Option<PathBuf>,

    /// Disable all forms of authentication
    #[arg(long, env = "BRIDGE_DISABLE_AUTH")]
    pub disable_auth: bool,

    /// OIDC client id
    #[arg(long, env = "BRIDGE_AUTH_CLIENT_ID")]
    pub auth_client_id: Option<String>,

    /// OIDC client secret
    #[arg(long, env = "BRIDGE_AUTH_CLIENT_SECRET", hide_env_values = true)]
    pub auth_client_secret: Option<String>,

    /// OIDC issuer URL
    #[arg(long, env = "BRIDGE_AUTH_ISSUER_URL")]
    pub auth_issuer_url: Option<Url>,

    /// Proxy the identity provider's user-management API under /api/dex/
    #[arg(long, env = "BRIDGE_ENABLE_DEX_USER_MANAGEMENT")]
    pub enable_dex_user_management: bool,

    /// Timeout in seconds for proxied backend calls
    #[arg(long, env = "BRIDGE_UPSTREAM_TIMEOUT", default_value_t = 30)]
    pub upstream_timeout: u64,

    /// Log filter, e.g. "bridge=debug,info"
    #[arg(long, env = "BRIDGE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> GatewayConfig {
        let mut config = GatewayConfig::new(self.listen, self.base_address, self.k8s_endpoint)
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_upstream_timeout(Duration::from_secs(self.upstream_timeout))
            .with_dex_user_management(self.enable_dex_user_management);

        if let (Some(cert), Some(key)) = (self.tls_cert_file, self.tls_key_file) {
            config = config.with_tls(cert, key);
        }

        config.ca_file = self.ca_file;
        config.insecure_skip_verify_cluster = self.k8s_insecure_skip_verify;

        if self.disable_auth {
            config = config.with_auth_disabled(self.k8s_bearer_token);
        } else {
            config.cluster_bearer_token = self.k8s_bearer_token;
            if let (Some(id), Some(secret), Some(issuer)) = (
                self.auth_client_id,
                self.auth_client_secret,
                self.auth_issuer_url,
            ) {
                config = config.with_oidc(id, secret, issuer);
            }
        }

        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = cli
        .log_level
        .clone()
        .unwrap_or_else(|| "bridge=info,bridge_server=info,bridge_auth=info,bridge_proxy=info,warn".to_string());

    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let config = cli.into_config();

    let server = Server::build(config)
        .await
        .context("failed to start the gateway")?;

    server.run().await.context("gateway exited with an error")?;

    Ok(())
}
