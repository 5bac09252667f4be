// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between the session reconciliation policy and the local store.

use async_trait::async_trait;

use crate::error::WashpanelError;
use crate::types::Session;

/// Durable local key-value store for serialized sessions.
///
/// `read` and `clear` must never fail: a session check cannot be allowed to
/// error merely because local persistence is briefly unavailable.
/// Implementations log storage failures and report them as "no session".
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Look up the session stored under `key`.
    ///
    /// Returns `None` on a missing key, malformed JSON, or storage access
    /// failure.
    async fn read(&self, key: &str) -> Option<Session>;

    /// Persist `session` under `key`, replacing any previous value.
    async fn write(&self, key: &str, session: &Session) -> Result<(), WashpanelError>;

    /// Remove `key`. Used on sign-out and on a revoked refresh token.
    /// Failures are logged by the implementation, not propagated.
    async fn clear(&self, key: &str);
}
