//! Backend route table with longest-prefix dispatch.

use std::time::Duration;

use reqwest::Url;

use crate::error::{ProxyError, Result};
use crate::extractor::TokenExtractor;
use crate::trust::TrustConfig;

/// A configured backend target with its own trust and credential policy.
///
/// Immutable for the process lifetime once the table is built.
#[derive(Debug, Clone)]
pub struct BackendRoute {
    pub name: String,
    /// Normalized to a leading and trailing slash.
    pub path_prefix: String,
    pub endpoint: Url,
    /// Headers stripped before forwarding; always contains `cookie`.
    pub header_blacklist: Vec<String>,
    pub extractor: TokenExtractor,
    pub(crate) client: reqwest::Client,
}

/// External name for the per-backend configuration bundle.
pub type ProxyConfig = BackendRoute;

impl BackendRoute {
    pub fn new(
        name: impl Into<String>,
        path_prefix: &str,
        endpoint: Url,
        trust: &TrustConfig,
        extractor: TokenExtractor,
        timeout: Duration,
    ) -> Result<Self> {
        if endpoint.scheme().is_empty() || !endpoint.has_host() {
            return Err(ProxyError::Config(format!(
                "backend endpoint {} must have a scheme and host",
                endpoint
            )));
        }

        Ok(Self {
            name: name.into(),
            path_prefix: normalize_prefix(path_prefix),
            endpoint,
            header_blacklist: vec!["cookie".to_string()],
            extractor,
            client: trust.build_client(timeout)?,
        })
    }

    pub fn with_header_blacklist(mut self, headers: Vec<String>) -> Self {
        self.header_blacklist = headers.into_iter().map(|h| h.to_ascii_lowercase()).collect();
        if !self.header_blacklist.iter().any(|h| h == "cookie") {
            self.header_blacklist.push("cookie".to_string());
        }
        self
    }

    pub(crate) fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix) || self.path_prefix.trim_end_matches('/') == path
    }

    /// Rebuild the request URL against the backend endpoint: the route
    /// prefix is stripped and the remainder joined onto the endpoint path.
    pub(crate) fn rewrite_url(&self, path: &str, query: Option<&str>) -> Url {
        let suffix = path.strip_prefix(&self.path_prefix).unwrap_or("");
        let base = self.endpoint.path().trim_end_matches('/');

        let mut url = self.endpoint.clone();
        url.set_path(&format!("{}/{}", base, suffix));
        url.set_query(query);
        url
    }
}

/// The set of configured backend routes. Read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<BackendRoute>,
}

impl RouteTable {
    /// Build the table, rejecting duplicate prefixes so dispatch is
    /// deterministic for every path.
    pub fn new(routes: Vec<BackendRoute>) -> Result<Self> {
        for (i, a) in routes.iter().enumerate() {
            for b in routes.iter().skip(i + 1) {
                if a.path_prefix == b.path_prefix {
                    return Err(ProxyError::Config(format!(
                        "routes {} and {} share the prefix {}",
                        a.name, b.name, a.path_prefix
                    )));
                }
            }
        }
        Ok(Self { routes })
    }

    /// Dispatch by longest-prefix match, so a more specific route takes
    /// precedence over a catch-all.
    pub fn route(&self, path: &str) -> Option<&BackendRoute> {
        self.routes
            .iter()
            .filter(|route| route.matches(path))
            .max_by_key(|route| route.path_prefix.len())
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendRoute> {
        self.routes.iter()
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let mut prefix = prefix.to_string();
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}
