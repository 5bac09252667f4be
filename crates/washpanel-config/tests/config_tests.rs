// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Washpanel configuration system.

use washpanel_config::model::WashpanelConfig;
use washpanel_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_washpanel_config() {
    let toml = r#"
[backend]
url = "https://demo.backend.example"
api_key = "anon-key"

[session]
request_timeout_ms = 20000
refresh_timeout_ms = 5000
validity_buffer_secs = 30
refresh_threshold_secs = 240
max_consecutive_timeouts = 3

[storage]
database_path = "/tmp/washpanel-test.db"

[realtime]
heartbeat_interval_secs = 15
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.backend.url.as_deref(), Some("https://demo.backend.example"));
    assert_eq!(config.backend.api_key.as_deref(), Some("anon-key"));
    assert_eq!(config.session.request_timeout_ms, 20_000);
    assert_eq!(config.session.refresh_timeout_ms, 5_000);
    assert_eq!(config.session.validity_buffer_secs, 30);
    assert_eq!(config.session.refresh_threshold_secs, 240);
    assert_eq!(config.session.max_consecutive_timeouts, 3);
    assert_eq!(config.storage.database_path, "/tmp/washpanel-test.db");
    assert_eq!(config.realtime.heartbeat_interval_secs, 15);
}

/// Unknown field in [session] produces an error mentioning the bad key.
#[test]
fn unknown_field_in_session_produces_error() {
    let toml = r#"
[session]
refesh_timeout_ms = 5000
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("refesh_timeout_ms"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert!(config.backend.url.is_none());
    assert!(config.backend.api_key.is_none());
    assert_eq!(config.session.request_timeout_ms, 15_000);
    assert_eq!(config.session.refresh_timeout_ms, 8_000);
    assert_eq!(config.session.validity_buffer_secs, 60);
    assert_eq!(config.session.refresh_threshold_secs, 300);
    assert_eq!(config.session.max_consecutive_timeouts, 2);
    assert_eq!(config.storage.database_path, "washpanel.db");
    assert_eq!(config.realtime.heartbeat_interval_secs, 30);
}

/// The validated entry point surfaces semantic errors, not just parse errors.
#[test]
fn load_and_validate_str_rejects_inverted_buffers() {
    let toml = r#"
[session]
validity_buffer_secs = 600
refresh_threshold_secs = 60
"#;

    let errors = load_and_validate_str(toml).expect_err("inverted buffers should fail");
    assert!(
        errors
            .iter()
            .any(|e| format!("{e}").contains("refresh_threshold_secs")),
        "got: {errors:?}"
    );
}

/// A parse error and a validation error never mix: parse errors win.
#[test]
fn load_and_validate_str_reports_unknown_key_with_suggestion_material() {
    let toml = r#"
[backend]
api_kye = "anon"
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should fail");
    let rendered = errors.iter().map(|e| format!("{e}")).collect::<Vec<_>>().join("\n");
    assert!(rendered.contains("api_kye"), "got: {rendered}");
}

/// Round-trip: a default config serializes to TOML that parses back clean.
#[test]
fn default_config_round_trips_through_toml() {
    let config = WashpanelConfig::default();
    let serialized = toml::to_string(&config).expect("defaults serialize");
    let reparsed = load_config_from_str(&serialized).expect("serialized defaults parse");
    assert_eq!(
        reparsed.session.request_timeout_ms,
        config.session.request_timeout_ms
    );
    assert_eq!(reparsed.storage.database_path, config.storage.database_path);
}
