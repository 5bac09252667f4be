// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Washpanel integration tests.
//!
//! Provides an in-memory [`MemoryCache`] so session-policy tests run fast
//! and deterministically without touching SQLite.

pub mod memory_cache;

pub use memory_cache::MemoryCache;

use washpanel_core::Session;

/// A session expiring `in_secs` seconds after `now`.
pub fn session_expiring_in(now: i64, in_secs: i64) -> Session {
    Session {
        access_token: "at-test".into(),
        refresh_token: "rt-test".into(),
        expires_at: now + in_secs,
        user_id: Some("u-test".into()),
    }
}
