// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SessionCache`] trait.
//!
//! The cache mirrors what the hosted SDK keeps in browser local storage:
//! one JSON-serialized session per backend environment, keyed by hostname.
//! Reads and clears never fail -- an unusable cache is reported as "no
//! session" so an authentication check is never blocked on local I/O.

use async_trait::async_trait;
use tracing::{debug, warn};

use washpanel_core::{Session, SessionCache, WashpanelError};

use crate::database::Database;
use crate::queries;

/// Derive the cache key for a backend environment from its hostname.
///
/// `demo.backend.example` -> `wp-demo.backend.example-auth`. Keeping the
/// hostname in the key means staging and production caches never collide.
pub fn cache_key(host: &str) -> String {
    format!("wp-{host}-auth")
}

/// SQLite-backed session cache.
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    /// Open (or create) the cache database at `path`.
    pub async fn open(path: &str) -> Result<Self, WashpanelError> {
        let db = Database::open(path).await?;
        debug!(path, "session cache opened");
        Ok(Self { db })
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(self) -> Result<(), WashpanelError> {
        self.db.close().await
    }
}

#[async_trait]
impl SessionCache for SqliteSessionStore {
    async fn read(&self, key: &str) -> Option<Session> {
        let raw = match queries::session_cache::get_value(&self.db, key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "session cache read failed, treating as no session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(key, error = %e, "cached session is malformed, treating as no session");
                None
            }
        }
    }

    async fn write(&self, key: &str, session: &Session) -> Result<(), WashpanelError> {
        let raw = serde_json::to_string(session).map_err(|e| WashpanelError::Storage {
            source: Box::new(e),
        })?;
        queries::session_cache::put_value(&self.db, key, &raw).await
    }

    async fn clear(&self, key: &str) {
        if let Err(e) = queries::session_cache::delete_value(&self.db, key).await {
            warn!(key, error = %e, "failed to clear cached session");
        }
    }
}
