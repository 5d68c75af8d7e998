//! Backend route table and credential-injecting reverse proxy for the
//! console bridge.
//!
//! Inbound browser requests are dispatched to named backend routes by
//! longest path-prefix match. On match the router strips browser-facing
//! headers, derives an outbound bearer credential via the route's
//! [`TokenExtractor`], and forwards the request over the route's own TLS
//! trust configuration.
//!
//! # Components
//!
//! - [`trust`] — CA bundle loading and per-route TLS client construction
//! - [`extractor`] — credential-sourcing strategies (constant, session cookie)
//! - [`route`] — the route table and longest-prefix dispatch
//! - [`forward`] — header sanitization, token injection, response relay

pub mod error;
pub mod extractor;
pub mod forward;
pub mod route;
pub mod trust;

pub use error::{ProxyError, Result};
pub use extractor::{TokenExtractor, cookie_value};
pub use forward::forward;
pub use route::{BackendRoute, ProxyConfig, RouteTable};
pub use trust::TrustConfig;
