// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deadline guard for network-bound operations.
//!
//! Every call that crosses the network boundary runs under [`DeadlineGuard::run`],
//! which races it against a timer. Dropping the losing future cancels the
//! underlying transport request, so a timed-out operation stops consuming
//! resources the moment the caller gives up.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use washpanel_core::WashpanelError;

/// Bounds operation latency and tracks consecutive failures.
///
/// The counter is the sole input to the client-recreation decision: timeouts
/// increment it here, other transient refresh failures increment it via
/// [`DeadlineGuard::note_failure`], and any success resets it to zero.
#[derive(Debug, Default)]
pub struct DeadlineGuard {
    consecutive_failures: AtomicU32,
}

impl DeadlineGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` with a hard deadline of `limit`.
    ///
    /// If the timer fires first the result is a [`WashpanelError::Timeout`]
    /// tagged with `label` and the bound, and `op` is dropped (aborting the
    /// in-flight request).
    pub async fn run<T, F>(&self, label: &str, limit: Duration, op: F) -> Result<T, WashpanelError>
    where
        F: Future<Output = Result<T, WashpanelError>>,
    {
        match tokio::time::timeout(limit, op).await {
            Ok(Ok(value)) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                Ok(value)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                Err(WashpanelError::Timeout {
                    label: label.to_string(),
                    limit,
                })
            }
        }
    }

    /// Count a non-timeout transient failure toward the recreation threshold.
    pub fn note_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Reset the counter, e.g. after the underlying client is recreated.
    pub fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }
}
