// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Washpanel crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An authenticated session: credential pair plus expiry.
///
/// The backend issues one on sign-in and on every refresh. The local cache
/// stores it JSON-serialized under a key derived from the backend hostname;
/// `expires_at` is epoch seconds, matching what the hosted SDK persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as Unix epoch seconds.
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Session {
    /// A session is valid against `buffer` iff it expires strictly later
    /// than `now + buffer`.
    ///
    /// Zero buffer asks "is it still alive at all"; the safe buffer asks
    /// "can a request sent now complete before expiry"; the refresh
    /// threshold asks "should a refresh be scheduled proactively".
    pub fn is_valid(&self, buffer: Duration, now_epoch: i64) -> bool {
        self.expires_at > now_epoch + buffer.as_secs() as i64
    }
}

/// Which side of an admin/worker conversation a participant is on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Admin,
    Worker,
}

impl ChatRole {
    /// The counterpart role. Sending as one role bumps the other role's
    /// unread counter; marking read flags the other role's messages.
    pub fn other(self) -> ChatRole {
        match self {
            ChatRole::Admin => ChatRole::Worker,
            ChatRole::Worker => ChatRole::Admin,
        }
    }
}

/// Conversation lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Closed,
}

/// An admin<->worker conversation row.
///
/// `last_message`/`last_message_at` are denormalized from the newest message
/// so conversation lists render without a join; the per-role unread counters
/// are bumped on send and zeroed on mark-read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub subject: String,
    pub status: ConversationStatus,
    pub admin_id: String,
    pub worker_id: String,
    pub admin_unread: i64,
    pub worker_unread: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
    pub created_at: String,
}

impl Conversation {
    /// Unread count as seen by `role`.
    pub fn unread_for(&self, role: ChatRole) -> i64 {
        match role {
            ChatRole::Admin => self.admin_unread,
            ChatRole::Worker => self.worker_unread,
        }
    }
}

/// A single chat message row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_role: ChatRole,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}
