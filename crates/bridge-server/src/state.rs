//! Application state shared across handlers.

use std::sync::Arc;

use bridge_auth::{Authenticator, SessionStore};
use bridge_proxy::RouteTable;

use crate::config::GatewayConfig;

/// State shared by all request handlers.
///
/// The route table is read-only after startup; the session store is the
/// only mutable shared structure, and only the authenticator writes it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub routes: Arc<RouteTable>,
    pub store: SessionStore,
    /// `None` when authentication is disabled.
    pub auther: Option<Arc<Authenticator>>,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        routes: RouteTable,
        store: SessionStore,
        auther: Option<Authenticator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            routes: Arc::new(routes),
            store,
            auther: auther.map(Arc::new),
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.auther.is_some()
    }
}
