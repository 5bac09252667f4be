// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Washpanel backend client.

use thiserror::Error;

/// The primary error type used across all Washpanel crates.
#[derive(Debug, Error)]
pub enum WashpanelError {
    /// Configuration errors (invalid TOML, missing required fields, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local session-cache errors (database open, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Auth endpoint errors other than the classified refresh outcomes.
    #[error("auth error: {message}")]
    Auth {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Table/REST endpoint errors (transport failure, non-2xx, bad payload).
    #[error("api error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Realtime channel errors (connect failure, malformed frame).
    #[error("realtime error: {message}")]
    Realtime {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation exceeded its deadline. `label` names the operation that
    /// was cut off, `limit` is the bound it ran against.
    #[error("{label} timed out after {limit:?}")]
    Timeout {
        label: String,
        limit: std::time::Duration,
    },

    /// The backend rejected the refresh token as unusable. Terminal: the
    /// caller must re-authenticate.
    #[error("refresh token rejected by the backend")]
    InvalidRefreshToken,

    /// There is no session to refresh -- the user is logged out.
    #[error("no active session")]
    SessionMissing,

    /// The underlying backend client was never constructed (misconfiguration).
    #[error("backend client is not initialized")]
    ClientNotInitialized,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WashpanelError {
    /// True for the timeout variant, which feeds the consecutive-timeout
    /// counter behind client recreation.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WashpanelError::Timeout { .. })
    }
}
