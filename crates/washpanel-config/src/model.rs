// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Washpanel backend client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Washpanel configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WashpanelConfig {
    /// Hosted backend endpoint and credentials.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Session validity buffers, deadlines, and recreation threshold.
    #[serde(default)]
    pub session: SessionConfig,

    /// Local session-cache storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Hosted backend endpoint configuration.
///
/// `url` left unset leaves the client handle uninitialized; every operation
/// through the handle then resolves to a "not initialized" error instead of
/// panicking, so a misconfigured dashboard still renders.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the hosted backend, e.g. `https://abc.backend.example`.
    #[serde(default)]
    pub url: Option<String>,

    /// Publishable API key sent as the `apikey` header on every request.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Session reconciliation tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Deadline for generic backend requests, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Deadline for session refresh specifically, in milliseconds. Shorter
    /// than the request deadline so the UI can fall back to cache quickly.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// A cached session is trusted while it remains valid this far ahead of
    /// expiry, in seconds.
    #[serde(default = "default_validity_buffer_secs")]
    pub validity_buffer_secs: u64,

    /// A session expiring within this window gets a proactive background
    /// refresh, in seconds.
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: u64,

    /// Consecutive refresh timeouts tolerated before the underlying client
    /// is recreated.
    #[serde(default = "default_max_consecutive_timeouts")]
    pub max_consecutive_timeouts: u32,
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    pub fn validity_buffer(&self) -> Duration {
        Duration::from_secs(self.validity_buffer_secs)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            validity_buffer_secs: default_validity_buffer_secs(),
            refresh_threshold_secs: default_refresh_threshold_secs(),
            max_consecutive_timeouts: default_max_consecutive_timeouts(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_refresh_timeout_ms() -> u64 {
    8_000
}

fn default_validity_buffer_secs() -> u64 {
    60
}

fn default_refresh_threshold_secs() -> u64 {
    300
}

fn default_max_consecutive_timeouts() -> u32 {
    2
}

/// Local session-cache storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file holding the session cache.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "washpanel.db".to_string()
}

/// Realtime channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// Interval between heartbeat frames on an open channel, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl RealtimeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}
