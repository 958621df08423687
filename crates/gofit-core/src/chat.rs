//! AI chat conversation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageId, UserId};

/// Default title for conversations created without one.
const UNTITLED: &str = "Untitled";

/// An AI chat conversation owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation id.
    pub id: ConversationId,

    /// The owning user.
    pub user_id: UserId,

    /// Display title.
    pub title: String,

    /// When the conversation was created.
    pub created_at: DateTime<Utc>,

    /// When the last message landed.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Create a new conversation; `title` defaults to "Untitled".
    #[must_use]
    pub fn new(user_id: UserId, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            user_id,
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check whether the conversation is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A single message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message id (ULID, time-ordered within the conversation).
    pub id: MessageId,

    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,

    /// Who sent the message.
    pub sender: MessageSender,

    /// Message text.
    pub body: String,

    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message sent by a user.
    #[must_use]
    pub fn user(conversation_id: ConversationId, user_id: UserId, body: String) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender: MessageSender::User(user_id),
            body,
            created_at: Utc::now(),
        }
    }

    /// Create a message sent by the assistant.
    #[must_use]
    pub fn assistant(conversation_id: ConversationId, body: String) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender: MessageSender::Assistant,
            body,
            created_at: Utc::now(),
        }
    }
}

/// The originator of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    /// Sent by the given user.
    User(UserId),

    /// Generated by the AI assistant.
    Assistant,
}
