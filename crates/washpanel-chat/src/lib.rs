// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin/worker chat for the Washpanel dashboard.
//!
//! [`ChatService`] persists messages and keeps the per-role unread counters,
//! [`RealtimeSubscriber`] delivers inserts over one WebSocket channel per
//! conversation, and [`ConversationFeed`] resolves the optimistic-append vs.
//! pushed-insert race by id dedup. Realtime is best effort throughout;
//! every conversation remains fully functional in pull mode.

pub mod feed;
pub mod realtime;
pub mod service;

pub use feed::ConversationFeed;
pub use realtime::{RealtimeSubscriber, Subscription, conversation_topic};
pub use service::ChatService;
