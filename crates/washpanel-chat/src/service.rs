// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and message operations against the backend's tables.
//!
//! Sending a message is two writes: the message row, then the conversation's
//! denormalized preview plus the other party's unread counter. The pair is
//! not transactional; if the bookkeeping step fails the message is already
//! durable, so the failure is logged and the send still succeeds. The badge
//! self-corrects on the next mark-read.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use washpanel_client::ClientHandle;
use washpanel_core::{ChatMessage, ChatRole, Conversation, WashpanelError};

const CONVERSATIONS: &str = "conversations";
const MESSAGES: &str = "chat_messages";

/// Chat operations issued through the client handle.
#[derive(Clone)]
pub struct ChatService {
    handle: Arc<ClientHandle>,
}

impl ChatService {
    pub fn new(handle: Arc<ClientHandle>) -> Self {
        Self { handle }
    }

    /// Open a conversation between an admin and a worker.
    pub async fn create_conversation(
        &self,
        admin_id: &str,
        worker_id: &str,
        subject: &str,
    ) -> Result<Conversation, WashpanelError> {
        let body = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "subject": subject,
            "status": "open",
            "admin_id": admin_id,
            "worker_id": worker_id,
            "admin_unread": 0,
            "worker_unread": 0,
            "created_at": chrono::Utc::now().to_rfc3339(),
        });
        self.handle.table(CONVERSATIONS).insert(&body).await
    }

    /// Conversations newest-activity first, for the inbox list.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, WashpanelError> {
        self.handle
            .table(CONVERSATIONS)
            .select("*")
            .order("last_message_at", false)
            .fetch()
            .await
    }

    /// All messages of one conversation in chronological order (pull mode).
    pub async fn get_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, WashpanelError> {
        self.handle
            .table(MESSAGES)
            .select("*")
            .eq("conversation_id", conversation_id)
            .order("created_at", true)
            .fetch()
            .await
    }

    /// Persist a message, then update the conversation's preview and the
    /// receiving party's unread counter.
    pub async fn send(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
        sender_role: ChatRole,
    ) -> Result<ChatMessage, WashpanelError> {
        let body = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "conversation_id": conversation_id,
            "sender_id": sender_id,
            "sender_role": sender_role,
            "content": content,
            "read": false,
            "created_at": chrono::Utc::now().to_rfc3339(),
        });
        let message: ChatMessage = self.handle.table(MESSAGES).insert(&body).await?;
        debug!(conversation_id, message_id = %message.id, "message stored");

        // The message is durable from here on; an under-counted badge is the
        // lesser failure compared to reporting the send as failed.
        if let Err(e) = self.bump_conversation(&message).await {
            warn!(
                conversation_id,
                error = %e,
                "message sent but conversation bookkeeping failed"
            );
        }

        Ok(message)
    }

    /// Zero `role`'s unread counter and bulk-flag the other party's unread
    /// messages as read. Calling this twice is a no-op the second time.
    pub async fn mark_read(
        &self,
        conversation_id: &str,
        role: ChatRole,
    ) -> Result<(), WashpanelError> {
        let mut patch = serde_json::Map::new();
        patch.insert(unread_column(role).to_string(), json!(0));
        self.handle
            .table(CONVERSATIONS)
            .eq("id", conversation_id)
            .update(&patch)
            .await?;

        self.handle
            .table(MESSAGES)
            .eq("conversation_id", conversation_id)
            .eq("sender_role", &role.other().to_string())
            .eq("read", "false")
            .update(&json!({ "read": true }))
            .await?;

        debug!(conversation_id, %role, "conversation marked read");
        Ok(())
    }

    /// Read-modify-write of the conversation row after a send.
    async fn bump_conversation(&self, message: &ChatMessage) -> Result<(), WashpanelError> {
        let conversation: Conversation = self
            .handle
            .table(CONVERSATIONS)
            .select("*")
            .eq("id", &message.conversation_id)
            .fetch_one()
            .await?;

        let receiver = message.sender_role.other();
        let mut patch = serde_json::Map::new();
        patch.insert("last_message".to_string(), json!(message.content));
        patch.insert("last_message_at".to_string(), json!(message.created_at));
        patch.insert(
            unread_column(receiver).to_string(),
            json!(conversation.unread_for(receiver) + 1),
        );

        self.handle
            .table(CONVERSATIONS)
            .eq("id", &message.conversation_id)
            .update(&patch)
            .await
    }
}

fn unread_column(role: ChatRole) -> &'static str {
    match role {
        ChatRole::Admin => "admin_unread",
        ChatRole::Worker => "worker_unread",
    }
}
