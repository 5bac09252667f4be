// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The stable client handle.
//!
//! Application code holds one [`ClientHandle`] for the process lifetime and
//! reaches the backend only through it. The underlying [`BackendClient`]
//! lives in an `ArcSwapOption` slot: every call loads whatever instance is
//! current at call time, so [`ClientHandle::recreate_client`] is invisible
//! to callers. Operations already in flight hold their own `Arc` and finish
//! against the old instance.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{info, warn};

use washpanel_config::model::BackendConfig;

use crate::auth::AuthApi;
use crate::backend::BackendClient;
use crate::deadline::DeadlineGuard;
use crate::table::TableQuery;

/// Long-lived indirection over the replaceable backend client.
pub struct ClientHandle {
    inner: ArcSwapOption<BackendClient>,
    backend_config: BackendConfig,
    guard: DeadlineGuard,
}

impl ClientHandle {
    /// Build the handle and its first underlying instance.
    ///
    /// A misconfigured backend (missing or invalid URL) leaves the slot
    /// empty: every operation then resolves to a typed "not initialized"
    /// error and the rest of the dashboard keeps rendering.
    pub fn new(backend_config: BackendConfig) -> Self {
        let inner = match BackendClient::new(&backend_config) {
            Ok(client) => ArcSwapOption::from(Some(Arc::new(client))),
            Err(e) => {
                warn!(error = %e, "backend client not constructed; calls will fail until recreated");
                ArcSwapOption::from(None)
            }
        };
        Self {
            inner,
            backend_config,
            guard: DeadlineGuard::new(),
        }
    }

    /// The instance that is current right now, if any.
    pub fn current(&self) -> Option<Arc<BackendClient>> {
        self.inner.load_full()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Auth API bound to the current instance.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.current())
    }

    /// Query builder for `table`, bound to the current instance.
    pub fn table(&self, table: &str) -> TableQuery {
        TableQuery::new(self.current(), table)
    }

    /// The deadline guard shared by every operation through this handle.
    pub fn guard(&self) -> &DeadlineGuard {
        &self.guard
    }

    /// Backend hostname from the current instance.
    pub fn host(&self) -> Option<String> {
        self.current().map(|c| c.host().to_string())
    }

    /// Discard the underlying instance and build a fresh one from the
    /// stored static configuration, then reset the failure counter.
    ///
    /// Safe to call at any time: the swap is a single atomic pointer store,
    /// so readers observe either the old or the new instance in full.
    pub fn recreate_client(&self) {
        match BackendClient::new(&self.backend_config) {
            Ok(client) => {
                self.inner.store(Some(Arc::new(client)));
                info!("backend client recreated");
            }
            Err(e) => {
                self.inner.store(None);
                warn!(error = %e, "backend client recreation failed; slot left empty");
            }
        }
        self.guard.reset();
    }
}
