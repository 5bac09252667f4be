// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL shape, non-zero deadlines, and the ordering of
//! the validity buffer and refresh threshold.

use crate::diagnostic::ConfigError;
use crate::model::WashpanelConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WashpanelConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // backend.url, when set, must be an http(s) URL.
    if let Some(url) = &config.backend.url {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            errors.push(ConfigError::Validation {
                message: "backend.url must not be empty when set".to_string(),
            });
        } else if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            errors.push(ConfigError::Validation {
                message: format!("backend.url `{trimmed}` must start with http:// or https://"),
            });
        }
    }

    if config.session.request_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "session.request_timeout_ms must be greater than zero".to_string(),
        });
    }

    if config.session.refresh_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "session.refresh_timeout_ms must be greater than zero".to_string(),
        });
    }

    // The proactive-refresh window must enclose the trust window, otherwise
    // a session could be trusted and refreshed against inverted buffers.
    if config.session.refresh_threshold_secs <= config.session.validity_buffer_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "session.refresh_threshold_secs ({}) must be greater than session.validity_buffer_secs ({})",
                config.session.refresh_threshold_secs, config.session.validity_buffer_secs
            ),
        });
    }

    if config.session.max_consecutive_timeouts == 0 {
        errors.push(ConfigError::Validation {
            message: "session.max_consecutive_timeouts must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.realtime.heartbeat_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.heartbeat_interval_secs must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
