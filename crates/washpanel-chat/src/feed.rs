// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory message list for one open conversation.
//!
//! The sender appends its own message optimistically after the insert
//! succeeds, and the realtime channel later pushes the same row. The two
//! arrivals race; id-based dedup keeps exactly one copy regardless of
//! order, with no sequence numbers involved.

use std::collections::HashSet;

use washpanel_core::ChatMessage;

/// Append-only, id-deduplicated message list.
#[derive(Default)]
pub struct ConversationFeed {
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
}

impl ConversationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the feed from a pull-mode fetch, deduplicating along the way.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        let mut feed = Self::new();
        for message in messages {
            feed.append(message);
        }
        feed
    }

    /// Append `message` unless its id was already seen.
    ///
    /// Returns `true` when the message was new.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
