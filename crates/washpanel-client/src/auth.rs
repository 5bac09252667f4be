// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth endpoint calls: token refresh, password sign-in, sign-out.
//!
//! Refresh failures are classified by status and body inspection into the
//! three outcomes the reconciliation policy distinguishes: a revoked token
//! (terminal, clears the cache), a missing session (user is signed out),
//! and everything else (transient, eligible for cache fallback).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use washpanel_core::{Session, WashpanelError};

use crate::backend::BackendClient;

/// Fallback token lifetime when the backend reports neither `expires_at`
/// nor `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Auth API surface, bound to whatever client instance was current when it
/// was obtained from the handle.
///
/// With no instance (misconfigured backend) every call resolves to
/// [`WashpanelError::ClientNotInitialized`] instead of panicking.
#[derive(Clone)]
pub struct AuthApi {
    client: Option<Arc<BackendClient>>,
}

/// Token grant response from the auth endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
}

/// Error body shapes the auth endpoint is known to produce.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl AuthApi {
    pub(crate) fn new(client: Option<Arc<BackendClient>>) -> Self {
        Self { client }
    }

    fn client(&self) -> Result<&Arc<BackendClient>, WashpanelError> {
        self.client
            .as_ref()
            .ok_or(WashpanelError::ClientNotInitialized)
    }

    /// Exchange a refresh token for a fresh session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, WashpanelError> {
        let client = self.client()?;
        let mut url = client.auth_endpoint("token");
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response = client
            .http()
            .post(url)
            .json(&RefreshGrant { refresh_token })
            .send()
            .await
            .map_err(|e| WashpanelError::Auth {
                message: format!("refresh request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_auth_failure(status, &body));
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| WashpanelError::Auth {
                message: format!("failed to parse token response: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!("session refreshed");
        Ok(session_from_token(token))
    }

    /// Password grant sign-in.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, WashpanelError> {
        let client = self.client()?;
        let mut url = client.auth_endpoint("token");
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = client
            .http()
            .post(url)
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(|e| WashpanelError::Auth {
                message: format!("sign-in request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_auth_failure(status, &body));
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| WashpanelError::Auth {
                message: format!("failed to parse token response: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!("signed in");
        Ok(session_from_token(token))
    }

    /// Revoke the session server-side.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), WashpanelError> {
        let client = self.client()?;
        let url = client.auth_endpoint("logout");

        let response = client
            .http()
            .post(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| WashpanelError::Auth {
                message: format!("sign-out request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_auth_failure(status, &body));
        }
        debug!("signed out");
        Ok(())
    }
}

fn session_from_token(token: TokenResponse) -> Session {
    let expires_at = token.expires_at.unwrap_or_else(|| {
        chrono::Utc::now().timestamp()
            + token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
    });
    Session {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at,
        user_id: token.user.map(|u| u.id),
    }
}

/// Classify a non-2xx auth response.
///
/// Only 4xx responses can carry the terminal classifications; any 5xx is
/// transient by definition and stays a generic auth error.
fn classify_auth_failure(status: reqwest::StatusCode, body: &str) -> WashpanelError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed
        .error_description
        .or(parsed.msg)
        .unwrap_or_else(|| body.to_string());

    if status.is_client_error() {
        let code = parsed.error.or(parsed.error_code).unwrap_or_default();
        let text = format!("{code} {detail}").to_lowercase();

        if code == "invalid_grant"
            || text.contains("refresh token not found")
            || text.contains("invalid refresh token")
            || text.contains("already used")
        {
            return WashpanelError::InvalidRefreshToken;
        }
        if text.contains("session missing") || text.contains("session_not_found") {
            return WashpanelError::SessionMissing;
        }
    }

    WashpanelError::Auth {
        message: format!("auth endpoint returned {status}: {detail}"),
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use washpanel_config::model::BackendConfig;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> AuthApi {
        let config = BackendConfig {
            url: Some(server.uri()),
            api_key: Some("anon-key".into()),
        };
        AuthApi::new(Some(Arc::new(BackendClient::new(&config).unwrap())))
    }

    #[tokio::test]
    async fn refresh_success_builds_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_partial_json(serde_json::json!({"refresh_token": "rt-old"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-new",
                "refresh_token": "rt-new",
                "expires_at": 1_900_000_000i64,
                "user": {"id": "u-1"}
            })))
            .mount(&server)
            .await;

        let session = api_for(&server).refresh("rt-old").await.unwrap();
        assert_eq!(session.access_token, "at-new");
        assert_eq!(session.refresh_token, "rt-new");
        assert_eq!(session.expires_at, 1_900_000_000);
        assert_eq!(session.user_id.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn refresh_derives_expiry_from_expires_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 900
            })))
            .mount(&server)
            .await;

        let before = chrono::Utc::now().timestamp();
        let session = api_for(&server).refresh("rt-old").await.unwrap();
        assert!(session.expires_at >= before + 900);
        assert!(session.expires_at <= chrono::Utc::now().timestamp() + 900);
    }

    #[tokio::test]
    async fn invalid_grant_classifies_as_invalid_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Already Used"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server).refresh("rt-revoked").await.unwrap_err();
        assert!(matches!(err, WashpanelError::InvalidRefreshToken), "got {err}");
    }

    #[tokio::test]
    async fn refresh_token_not_found_message_also_classifies_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "msg": "refresh token not found"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server).refresh("rt-gone").await.unwrap_err();
        assert!(matches!(err, WashpanelError::InvalidRefreshToken), "got {err}");
    }

    #[tokio::test]
    async fn session_missing_classifies_as_logged_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "msg": "Auth session missing"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server).refresh("rt").await.unwrap_err();
        assert!(matches!(err, WashpanelError::SessionMissing), "got {err}");
    }

    #[tokio::test]
    async fn server_error_stays_generic_even_with_grant_wording() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "msg": "invalid refresh token store unavailable"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server).refresh("rt").await.unwrap_err();
        assert!(matches!(err, WashpanelError::Auth { .. }), "got {err}");
    }

    #[tokio::test]
    async fn password_sign_in_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(
                serde_json::json!({"email": "ops@example.com", "password": "hunter2"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_at": 1_900_000_000i64
            })))
            .mount(&server)
            .await;

        let session = api_for(&server)
            .sign_in_with_password("ops@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(session.access_token, "at");
    }

    #[tokio::test]
    async fn sign_out_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(wiremock::matchers::header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        api_for(&server).sign_out("at-1").await.unwrap();
    }

    #[tokio::test]
    async fn uninitialized_client_resolves_to_typed_error() {
        let api = AuthApi::new(None);
        let err = api.refresh("rt").await.unwrap_err();
        assert!(matches!(err, WashpanelError::ClientNotInitialized), "got {err}");
    }
}
