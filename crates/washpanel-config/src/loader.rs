// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./washpanel.toml` > `~/.config/washpanel/washpanel.toml`
//! > `/etc/washpanel/washpanel.toml` with environment variable overrides via
//! the `WASHPANEL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WashpanelConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/washpanel/washpanel.toml` (system-wide)
/// 3. `~/.config/washpanel/washpanel.toml` (user XDG config)
/// 4. `./washpanel.toml` (local directory)
/// 5. `WASHPANEL_*` environment variables
pub fn load_config() -> Result<WashpanelConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and for callers that already hold the TOML content.
pub fn load_config_from_str(toml_content: &str) -> Result<WashpanelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WashpanelConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WashpanelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WashpanelConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use -- callers can inspect metadata before extraction).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WashpanelConfig::default()))
        .merge(Toml::file("/etc/washpanel/washpanel.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("washpanel/washpanel.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("washpanel.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` so underscore-containing key
/// names stay unambiguous: `WASHPANEL_SESSION_REQUEST_TIMEOUT_MS` must map
/// to `session.request_timeout_ms`, not `session.request.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("WASHPANEL_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WASHPANEL_BACKEND_API_KEY -> "backend_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("backend_", "backend.", 1)
            .replacen("session_", "session.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("realtime_", "realtime.", 1);
        mapped.into()
    })
}
