// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Washpanel backend client.
//!
//! This crate provides the error type, the shared domain types (sessions,
//! conversations, messages), and the [`SessionCache`] seam implemented by
//! the local storage crate. All other Washpanel crates build on these.

pub mod cache;
pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use cache::SessionCache;
pub use error::WashpanelError;
pub use types::{ChatMessage, ChatRole, Conversation, ConversationStatus, Session};
