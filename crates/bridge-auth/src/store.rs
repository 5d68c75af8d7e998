//! Concurrency-safe store for login states and authenticated sessions.
//!
//! The store is the only mutable structure shared across request handlers.
//! Login states are single-use anti-CSRF values consumed exactly once by a
//! matching callback; sessions carry the validated identity material read
//! by the proxy's token extractor. Both expire and are evicted by a
//! periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// How long a login state stays redeemable before the attempt is abandoned.
pub const LOGIN_STATE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A pending login attempt keyed by its anti-CSRF state value.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// Cryptographically random, unguessable state value.
    pub state_value: String,
    pub created_at: DateTime<Utc>,
    /// Where to send the browser after a successful callback.
    pub return_path: String,
}

impl LoginState {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::TimeDelta::from_std(LOGIN_STATE_TTL).unwrap_or_default();
        now - self.created_at > ttl
    }
}

/// An authenticated browser session issued after a successful code exchange.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    /// Derived from the identity token's own expiry, never extended past it.
    pub expires_at: DateTime<Utc>,
    /// The identity token's `sub` claim.
    pub subject: String,
    /// The raw identity token, forwarded as the outbound bearer credential.
    pub id_token: String,
    pub refresh_token: Option<String>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Default)]
struct Inner {
    logins: HashMap<String, LoginState>,
    sessions: HashMap<String, AuthSession>,
}

/// Shared store correlating login states and session identifiers with
/// validated identity material.
///
/// `consume_login` is exactly-once: of two callbacks racing on the same
/// state value, only one observes the entry.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a pending login attempt.
    pub async fn put_login(&self, login: LoginState) {
        let mut inner = self.inner.write().await;
        inner.logins.insert(login.state_value.clone(), login);
    }

    /// Atomically look up and delete a login state.
    ///
    /// Returns `None` for unknown, already-consumed, or expired states; a
    /// replayed callback with the same state always fails afterwards.
    pub async fn consume_login(&self, state_value: &str) -> Option<LoginState> {
        let mut inner = self.inner.write().await;
        let login = inner.logins.remove(state_value)?;
        if login.is_expired(Utc::now()) {
            return None;
        }
        Some(login)
    }

    /// Persist an authenticated session.
    pub async fn put_session(&self, session: AuthSession) {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(session.session_id.clone(), session);
    }

    /// Look up a session by identifier.
    ///
    /// A session past its expiry is treated identically to no session at
    /// all; the entry is left for the sweep to evict.
    pub async fn get_session(&self, session_id: &str) -> Option<AuthSession> {
        let inner = self.inner.read().await;
        let session = inner.sessions.get(session_id)?;
        if session.is_expired(Utc::now()) {
            return None;
        }
        Some(session.clone())
    }

    /// Remove a session (explicit logout).
    pub async fn remove_session(&self, session_id: &str) -> Option<AuthSession> {
        let mut inner = self.inner.write().await;
        inner.sessions.remove(session_id)
    }

    /// Evict expired login states and sessions.
    ///
    /// Returns the number of entries evicted.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let before = inner.logins.len() + inner.sessions.len();
        inner.logins.retain(|_, login| !login.is_expired(now));
        inner.sessions.retain(|_, session| !session.is_expired(now));
        before - (inner.logins.len() + inner.sessions.len())
    }

    /// Spawn a background task that sweeps expired entries periodically.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let evicted = store.sweep().await;
                if evicted > 0 {
                    debug!(evicted, "evicted expired auth entries");
                }
            }
        })
    }

    /// Number of live login states (test visibility).
    pub async fn login_count(&self) -> usize {
        self.inner.read().await.logins.len()
    }

    /// Number of live sessions (test visibility).
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(state: &str) -> LoginState {
        LoginState {
            state_value: state.to_string(),
            created_at: Utc::now(),
            return_path: "/".to_string(),
        }
    }

    fn session(id: &str, expires_in_secs: i64) -> AuthSession {
        let now = Utc::now();
        AuthSession {
            session_id: id.to_string(),
            issued_at: now,
            expires_at: now + chrono::TimeDelta::seconds(expires_in_secs),
            subject: "user-1".to_string(),
            id_token: "token".to_string(),
            refresh_token: None,
        }
    }

    #[tokio::test]
    async fn test_consume_login_is_single_use() {
        let store = SessionStore::new();
        store.put_login(login("abc")).await;

        assert!(store.consume_login("abc").await.is_some());
        assert!(store.consume_login("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_consume_unknown_login_fails() {
        let store = SessionStore::new();
        assert!(store.consume_login("never-issued").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_consume_exactly_one_winner() {
        let store = SessionStore::new();
        store.put_login(login("raced")).await;

        let (a, b) = tokio::join!(store.consume_login("raced"), store.consume_login("raced"));
        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
    }

    #[tokio::test]
    async fn test_expired_login_not_consumable() {
        let store = SessionStore::new();
        let mut stale = login("old");
        stale.created_at = Utc::now() - chrono::TimeDelta::seconds(600);
        store.put_login(stale).await;

        assert!(store.consume_login("old").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_reads_as_absent() {
        let store = SessionStore::new();
        store.put_session(session("live", 3600)).await;
        store.put_session(session("dead", -1)).await;

        assert!(store.get_session("live").await.is_some());
        assert!(store.get_session("dead").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_session() {
        let store = SessionStore::new();
        store.put_session(session("s1", 3600)).await;

        assert!(store.remove_session("s1").await.is_some());
        assert!(store.get_session("s1").await.is_none());
        assert!(store.remove_session("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_entries() {
        let store = SessionStore::new();
        let mut stale = login("stale");
        stale.created_at = Utc::now() - chrono::TimeDelta::seconds(600);
        store.put_login(stale).await;
        store.put_login(login("fresh")).await;
        store.put_session(session("dead", -1)).await;
        store.put_session(session("live", 3600)).await;

        let evicted = store.sweep().await;
        assert_eq!(evicted, 2);
        assert_eq!(store.login_count().await, 1);
        assert_eq!(store.session_count().await, 1);
    }
}
