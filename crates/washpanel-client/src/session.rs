// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session reconciliation policy.
//!
//! [`SessionManager::ensure_session`] answers "do we currently have a usable
//! session?" preferring stale-but-present local state over blocking network
//! calls. Every branch that can be decided from the cache returns without
//! awaiting the network; only an absent or unsafe session pays a refresh,
//! and even that path is deadline-bounded with a cache-fallback escape
//! hatch. A call must never hang, and a valid cached session must survive a
//! transient network blackout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use washpanel_config::model::SessionConfig;
use washpanel_core::{Session, SessionCache, WashpanelError};
use washpanel_storage::cache_key;

use crate::auth::AuthApi;
use crate::backend::BackendClient;
use crate::handle::ClientHandle;

/// Where an `ensure_session` answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Cached session comfortably valid.
    Cache,
    /// Blocking refresh succeeded.
    Refresh,
    /// Refresh failed transiently but the cached session is not yet expired.
    CacheFallback,
    /// The backend revoked the refresh token; re-authentication required.
    InvalidToken,
    /// Nothing to refresh: the user is signed out.
    Logout,
    /// No underlying client exists.
    NoClient,
    /// Refresh failed and no usable cached session remains.
    NoSession,
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionSource::Cache => "cache",
            SessionSource::Refresh => "refresh",
            SessionSource::CacheFallback => "cache-fallback",
            SessionSource::InvalidToken => "invalid-token",
            SessionSource::Logout => "logout",
            SessionSource::NoClient => "no-client",
            SessionSource::NoSession => "none",
        };
        write!(f, "{name}")
    }
}

/// Tri-state result of a session check. Session failures are resolved into
/// this and never thrown past the policy boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub valid: bool,
    pub source: SessionSource,
}

impl SessionStatus {
    fn valid(source: SessionSource) -> Self {
        Self { valid: true, source }
    }

    fn invalid(source: SessionSource) -> Self {
        Self {
            valid: false,
            source,
        }
    }
}

/// The session reconciliation policy over a client handle and a local cache.
#[derive(Clone)]
pub struct SessionManager {
    handle: Arc<ClientHandle>,
    cache: Arc<dyn SessionCache>,
    config: SessionConfig,
    key: String,
}

impl SessionManager {
    pub fn new(
        handle: Arc<ClientHandle>,
        cache: Arc<dyn SessionCache>,
        config: SessionConfig,
    ) -> Self {
        let key = match handle.host() {
            Some(host) => cache_key(&host),
            None => cache_key("unconfigured"),
        };
        Self {
            handle,
            cache,
            config,
            key,
        }
    }

    /// The cache key this manager reads and clears.
    pub fn session_key(&self) -> &str {
        &self.key
    }

    /// Best-effort answer to "do we have a usable session?".
    pub async fn ensure_session(&self) -> SessionStatus {
        let Some(client) = self.handle.current() else {
            debug!("no backend client, session unavailable");
            return SessionStatus::invalid(SessionSource::NoClient);
        };

        let now = chrono::Utc::now().timestamp();
        let cached = self.cache.read(&self.key).await;

        if let Some(session) = &cached {
            if session.is_valid(self.config.validity_buffer(), now) {
                if !session.is_valid(self.config.refresh_threshold(), now) {
                    debug!(
                        expires_at = session.expires_at,
                        "cached session expiring soon, scheduling background refresh"
                    );
                    self.spawn_background_refresh();
                }
                return SessionStatus::valid(SessionSource::Cache);
            }
        }

        self.blocking_refresh(client, cached, now).await
    }

    /// Current access token from the cache, for attaching to table queries.
    pub async fn access_token(&self) -> Option<String> {
        self.cache.read(&self.key).await.map(|s| s.access_token)
    }

    /// Password sign-in; persists the session on success.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, WashpanelError> {
        let auth = self.handle.auth();
        let session = self
            .handle
            .guard()
            .run(
                "password sign-in",
                self.config.request_timeout(),
                auth.sign_in_with_password(email, password),
            )
            .await?;
        self.persist(&session).await;
        Ok(session)
    }

    /// Revoke server-side (best effort) and always drop the local session.
    pub async fn sign_out(&self) {
        let cached = self.cache.read(&self.key).await;
        if let Some(session) = cached {
            let auth = self.handle.auth();
            let revoke = self.handle.guard().run(
                "sign-out",
                self.config.request_timeout(),
                auth.sign_out(&session.access_token),
            );
            if let Err(e) = revoke.await {
                warn!(error = %e, "server-side sign-out failed, clearing local session anyway");
            }
        }
        self.cache.clear(&self.key).await;
    }

    async fn blocking_refresh(
        &self,
        client: Arc<BackendClient>,
        cached: Option<Session>,
        now: i64,
    ) -> SessionStatus {
        match self.refresh_once(&client, cached.as_ref()).await {
            Ok(_) => SessionStatus::valid(SessionSource::Refresh),
            Err(WashpanelError::InvalidRefreshToken) => {
                warn!("refresh token rejected, clearing cached session");
                self.cache.clear(&self.key).await;
                SessionStatus::invalid(SessionSource::InvalidToken)
            }
            Err(WashpanelError::SessionMissing) => {
                debug!("nothing to refresh, user is signed out");
                SessionStatus::invalid(SessionSource::Logout)
            }
            Err(e) => {
                // Timeouts were already counted by the deadline guard.
                if !e.is_timeout() {
                    self.handle.guard().note_failure();
                }
                let failures = self.handle.guard().consecutive_failures();
                warn!(error = %e, failures, "session refresh failed");

                let status = match &cached {
                    Some(session) if session.is_valid(Duration::ZERO, now) => {
                        SessionStatus::valid(SessionSource::CacheFallback)
                    }
                    _ => SessionStatus::invalid(SessionSource::NoSession),
                };

                if failures >= self.config.max_consecutive_timeouts {
                    warn!(failures, "refresh failure threshold reached, recreating backend client");
                    self.handle.recreate_client();
                }

                status
            }
        }
    }

    /// One deadline-guarded refresh attempt; persists the new session.
    async fn refresh_once(
        &self,
        client: &Arc<BackendClient>,
        cached: Option<&Session>,
    ) -> Result<Session, WashpanelError> {
        let refresh_token = cached
            .map(|s| s.refresh_token.clone())
            .ok_or(WashpanelError::SessionMissing)?;

        let auth = AuthApi::new(Some(client.clone()));
        let session = self
            .handle
            .guard()
            .run(
                "session refresh",
                self.config.refresh_timeout(),
                auth.refresh(&refresh_token),
            )
            .await?;
        self.persist(&session).await;
        Ok(session)
    }

    /// Fire-and-forget refresh. Outcomes are only logged; an invalid token
    /// still clears the cache so the next foreground call sees the truth.
    fn spawn_background_refresh(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let Some(client) = this.handle.current() else {
                return;
            };
            let cached = this.cache.read(&this.key).await;
            match this.refresh_once(&client, cached.as_ref()).await {
                Ok(_) => debug!("background session refresh complete"),
                Err(WashpanelError::InvalidRefreshToken) => {
                    warn!("background refresh: token rejected, clearing cached session");
                    this.cache.clear(&this.key).await;
                }
                Err(e) => debug!(error = %e, "background session refresh failed"),
            }
        });
    }

    /// Cache the session; a failed write is logged and swallowed because an
    /// uncacheable session still authenticates the running process.
    async fn persist(&self, session: &Session) {
        if let Err(e) = self.cache.write(&self.key, session).await {
            warn!(error = %e, "failed to persist session to local cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use washpanel_config::model::BackendConfig;
    use washpanel_test_utils::{MemoryCache, session_expiring_in};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> SessionConfig {
        SessionConfig {
            request_timeout_ms: 2_000,
            refresh_timeout_ms: 2_000,
            validity_buffer_secs: 60,
            refresh_threshold_secs: 300,
            max_consecutive_timeouts: 2,
        }
    }

    fn handle_for(server: &MockServer) -> Arc<ClientHandle> {
        Arc::new(ClientHandle::new(BackendConfig {
            url: Some(server.uri()),
            api_key: Some("anon-key".into()),
        }))
    }

    fn refresh_ok_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "at-refreshed",
            "refresh_token": "rt-refreshed",
            "expires_at": chrono::Utc::now().timestamp() + 3600
        })
    }

    async fn manager_with_session(
        server: &MockServer,
        config: SessionConfig,
        expires_in: i64,
    ) -> (SessionManager, Arc<MemoryCache>, Arc<ClientHandle>) {
        let handle = handle_for(server);
        let now = chrono::Utc::now().timestamp();
        let key = cache_key(&handle.host().unwrap());
        let cache = Arc::new(MemoryCache::seeded(&key, session_expiring_in(now, expires_in)).await);
        let manager = SessionManager::new(handle.clone(), cache.clone(), config);
        (manager, cache, handle)
    }

    async fn settle_background(server: &MockServer, expected: usize) {
        for _ in 0..100 {
            if server.received_requests().await.unwrap_or_default().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn comfortably_valid_session_answers_from_cache_without_network() {
        let server = MockServer::start().await;
        let (manager, _cache, _handle) =
            manager_with_session(&server, test_config(), 3_600).await;

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::valid(SessionSource::Cache));

        // Give any stray background task a moment, then confirm silence.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expiring_soon_session_returns_cache_and_fires_one_background_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(refresh_ok_body()))
            .mount(&server)
            .await;

        // Valid at the 60s buffer, inside the 300s proactive window.
        let (manager, cache, _handle) =
            manager_with_session(&server, test_config(), 120).await;

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::valid(SessionSource::Cache));

        settle_background(&server, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            1,
            "exactly one background refresh expected"
        );
        // The background refresh persisted the new session.
        assert_eq!(
            cache.read(manager.session_key()).await.unwrap().access_token,
            "at-refreshed"
        );
    }

    #[tokio::test]
    async fn expired_session_pays_a_blocking_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(refresh_ok_body()))
            .mount(&server)
            .await;

        // 30s left: inside the 60s safety buffer, so not trusted.
        let (manager, cache, _handle) =
            manager_with_session(&server, test_config(), 30).await;

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::valid(SessionSource::Refresh));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert_eq!(
            cache.read(manager.session_key()).await.unwrap().access_token,
            "at-refreshed"
        );
    }

    #[tokio::test]
    async fn transient_refresh_failure_falls_back_to_live_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // Not safe (30s < 60s buffer) but not hard-expired either.
        let (manager, cache, _handle) =
            manager_with_session(&server, test_config(), 30).await;

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::valid(SessionSource::CacheFallback));
        // The stale session stays cached for the next attempt.
        assert!(cache.read(manager.session_key()).await.is_some());
    }

    #[tokio::test]
    async fn transient_failure_with_hard_expired_session_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (manager, _cache, _handle) =
            manager_with_session(&server, test_config(), -10).await;

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::invalid(SessionSource::NoSession));
    }

    #[tokio::test]
    async fn revoked_token_clears_cache_and_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token"
            })))
            .mount(&server)
            .await;

        let (manager, cache, _handle) =
            manager_with_session(&server, test_config(), 30).await;

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::invalid(SessionSource::InvalidToken));
        assert!(cache.read(manager.session_key()).await.is_none());
        assert_eq!(cache.clear_count(), 1);
    }

    #[tokio::test]
    async fn empty_cache_resolves_to_logout_without_network() {
        let server = MockServer::start().await;
        let handle = handle_for(&server);
        let cache = Arc::new(MemoryCache::new());
        let manager = SessionManager::new(handle, cache, test_config());

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::invalid(SessionSource::Logout));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_client_short_circuits() {
        let handle = Arc::new(ClientHandle::new(BackendConfig::default()));
        let cache = Arc::new(MemoryCache::new());
        let manager = SessionManager::new(handle, cache, test_config());

        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::invalid(SessionSource::NoClient));
    }

    #[tokio::test]
    async fn consecutive_timeouts_recreate_the_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(refresh_ok_body())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = SessionConfig {
            refresh_timeout_ms: 50,
            ..test_config()
        };
        let (manager, _cache, handle) = manager_with_session(&server, config, 30).await;
        let first_instance = handle.current().unwrap();

        // First timeout: counted, client untouched.
        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::valid(SessionSource::CacheFallback));
        assert_eq!(handle.guard().consecutive_failures(), 1);
        assert!(Arc::ptr_eq(&first_instance, &handle.current().unwrap()));

        // Second consecutive timeout reaches the threshold of 2.
        let status = manager.ensure_session().await;
        assert_eq!(status, SessionStatus::valid(SessionSource::CacheFallback));
        assert!(
            !Arc::ptr_eq(&first_instance, &handle.current().unwrap()),
            "client should be recreated at the threshold"
        );
        assert_eq!(handle.guard().consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn sign_in_persists_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-login",
                "refresh_token": "rt-login",
                "expires_at": chrono::Utc::now().timestamp() + 3600,
                "user": {"id": "u-9"}
            })))
            .mount(&server)
            .await;

        let handle = handle_for(&server);
        let cache = Arc::new(MemoryCache::new());
        let manager = SessionManager::new(handle, cache.clone(), test_config());

        let session = manager.sign_in("ops@example.com", "hunter2").await.unwrap();
        assert_eq!(session.user_id.as_deref(), Some("u-9"));
        assert_eq!(
            cache.read(manager.session_key()).await.unwrap().access_token,
            "at-login"
        );
        assert_eq!(manager.access_token().await.as_deref(), Some("at-login"));
    }

    #[tokio::test]
    async fn sign_out_clears_cache_even_when_revocation_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (manager, cache, _handle) =
            manager_with_session(&server, test_config(), 3_600).await;

        manager.sign_out().await;
        assert!(cache.read(manager.session_key()).await.is_none());
    }

    #[test]
    fn session_sources_render_their_wire_names() {
        let rendered: Vec<String> = [
            SessionSource::Cache,
            SessionSource::Refresh,
            SessionSource::CacheFallback,
            SessionSource::InvalidToken,
            SessionSource::Logout,
            SessionSource::NoClient,
            SessionSource::NoSession,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(
            rendered,
            vec![
                "cache",
                "refresh",
                "cache-fallback",
                "invalid-token",
                "logout",
                "no-client",
                "none"
            ]
        );
    }
}
