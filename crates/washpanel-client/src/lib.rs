// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-resilient client for the Washpanel hosted backend.
//!
//! The dashboard holds one [`ClientHandle`] and reaches auth, tables, and
//! realtime through it. [`SessionManager`] answers authentication checks
//! cache-first: a valid cached session is trusted without network, an
//! expiring one triggers a non-blocking background refresh, and only an
//! absent or unsafe session pays a deadline-guarded blocking refresh with a
//! cache fallback on transient failure. Repeated refresh timeouts recreate
//! the underlying client behind the handle without re-wiring any caller.

pub mod auth;
pub mod backend;
pub mod deadline;
pub mod handle;
pub mod session;
pub mod table;

pub use auth::AuthApi;
pub use backend::BackendClient;
pub use deadline::DeadlineGuard;
pub use handle::ClientHandle;
pub use session::{SessionManager, SessionSource, SessionStatus};
pub use table::TableQuery;
