// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The underlying backend client instance.
//!
//! [`BackendClient`] owns the HTTP connection pool and the derived endpoint
//! URLs for the hosted backend's auth, table, and realtime surfaces. It is
//! always reached through the [`crate::handle::ClientHandle`], never held
//! directly, so it can be discarded and recreated without re-wiring callers.

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue};
use washpanel_config::model::BackendConfig;
use washpanel_core::WashpanelError;

/// One live connection to the hosted backend.
#[derive(Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl BackendClient {
    /// Build a client from static configuration.
    ///
    /// Fails on a missing or unparseable base URL; the handle turns that
    /// into an empty slot rather than a panic.
    pub fn new(config: &BackendConfig) -> Result<Self, WashpanelError> {
        let raw_url = config
            .url
            .as_deref()
            .ok_or_else(|| WashpanelError::Config("backend.url is not set".to_string()))?;
        let base_url = Url::parse(raw_url)
            .map_err(|e| WashpanelError::Config(format!("backend.url `{raw_url}` is invalid: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(
                "apikey",
                HeaderValue::from_str(key).map_err(|e| {
                    WashpanelError::Config(format!("backend.api_key is not a valid header value: {e}"))
                })?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WashpanelError::Api {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// The backend hostname, used to derive the session-cache key.
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or("unknown")
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Auth endpoint: `{base}/auth/v1/{path}`.
    pub fn auth_endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("auth/v1/{path}"));
        url
    }

    /// Table endpoint: `{base}/rest/v1/{table}`.
    pub fn rest_endpoint(&self, table: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("rest/v1/{table}"));
        url
    }

    /// Realtime socket endpoint: `{base}/realtime/v1/websocket` with the
    /// scheme switched to ws(s) and the API key as a query parameter.
    pub fn realtime_endpoint(&self) -> Url {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        // set_scheme only rejects invalid transitions; ws/wss from http(s) is fine.
        let _ = url.set_scheme(scheme);
        url.set_path("realtime/v1/websocket");
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("apikey", key);
        }
        url
    }
}
