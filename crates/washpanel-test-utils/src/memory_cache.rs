// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session cache for deterministic testing.
//!
//! `MemoryCache` implements `SessionCache` over a mutex-guarded map and
//! counts reads, writes, and clears so tests can assert on cache traffic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use washpanel_core::{Session, SessionCache, WashpanelError};

/// A session cache backed by a plain map.
#[derive(Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Session>>>,
    reads: AtomicU32,
    writes: AtomicU32,
    clears: AtomicU32,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-seeded with one session under `key`.
    pub async fn seeded(key: &str, session: Session) -> Self {
        let cache = Self::new();
        cache
            .entries
            .lock()
            .await
            .insert(key.to_string(), session);
        cache
    }

    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn clear_count(&self) -> u32 {
        self.clears.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionCache for MemoryCache {
    async fn read(&self, key: &str) -> Option<Session> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().await.get(key).cloned()
    }

    async fn write(&self, key: &str, session: &Session) -> Result<(), WashpanelError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .await
            .insert(key.to_string(), session.clone());
        Ok(())
    }

    async fn clear(&self, key: &str) {
        self.clears.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_expiring_in;

    #[tokio::test]
    async fn seeded_cache_serves_and_counts() {
        let cache = MemoryCache::seeded("wp-test-auth", session_expiring_in(1_000, 600)).await;

        assert!(cache.read("wp-test-auth").await.is_some());
        assert!(cache.read("wp-other-auth").await.is_none());
        assert_eq!(cache.read_count(), 2);

        cache.clear("wp-test-auth").await;
        assert!(cache.read("wp-test-auth").await.is_none());
        assert_eq!(cache.clear_count(), 1);
    }
}
