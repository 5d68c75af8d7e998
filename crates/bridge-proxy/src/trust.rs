//! Certificate trust management for outbound backend connections.

use std::path::Path;
use std::time::Duration;

use crate::error::{ProxyError, Result};

/// Root-certificate policy applied to a backend's TLS client.
///
/// Built once at startup; a CA bundle that is unreadable or contains no
/// parseable certificate is fatal rather than silently degraded, since an
/// empty trust store would make TLS validation meaningless.
#[derive(Debug, Clone, Default)]
pub struct TrustConfig {
    roots: Vec<reqwest::Certificate>,
    insecure_skip_verify: bool,
}

impl TrustConfig {
    /// Trust the platform's default root store.
    pub fn system() -> Self {
        Self::default()
    }

    /// Trust the certificates in a PEM-encoded CA bundle.
    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read(path).map_err(|e| {
            ProxyError::Config(format!("unreadable CA bundle {}: {}", path.display(), e))
        })?;

        let roots = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
            ProxyError::Config(format!("could not parse CA bundle {}: {}", path.display(), e))
        })?;

        if roots.is_empty() {
            return Err(ProxyError::Config(format!(
                "CA bundle {} contains no certificates",
                path.display()
            )));
        }

        Ok(Self {
            roots,
            insecure_skip_verify: false,
        })
    }

    /// Platform roots if no bundle path is configured.
    pub fn from_optional_pem_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_pem_file(path),
            None => Ok(Self::system()),
        }
    }

    /// Skip certificate verification entirely. Dev only.
    pub fn insecure_skip_verify() -> Self {
        Self {
            roots: Vec::new(),
            insecure_skip_verify: true,
        }
    }

    /// Build an HTTP client carrying this trust policy and a fixed
    /// request timeout.
    pub fn build_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(timeout);

        for cert in &self.roots {
            builder = builder.add_root_certificate(cert.clone());
        }

        if self.insecure_skip_verify {
            tracing::warn!("TLS certificate verification is DISABLED for a backend route");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| ProxyError::Config(format!("could not build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_bundle_is_fatal() {
        let err = TrustConfig::from_pem_file(Path::new("/nonexistent/ca.pem")).unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[test]
    fn test_unparseable_bundle_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not pem").unwrap();

        let err = TrustConfig::from_pem_file(file.path()).unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[test]
    fn test_no_path_falls_back_to_system_roots() {
        let trust = TrustConfig::from_optional_pem_file(None).unwrap();
        assert!(trust.build_client(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_insecure_client_builds() {
        let trust = TrustConfig::insecure_skip_verify();
        assert!(trust.build_client(Duration::from_secs(5)).is_ok());
    }
}
