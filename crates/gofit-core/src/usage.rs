//! AI usage record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConversationId, UsageId, UserId};

/// One metered AI interaction.
///
/// A usage record is only ever written together with the balance debit that
/// pays for it; the store commits both in a single atomic operation, so a
/// record existing implies the corresponding `cost` was deducted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique record id (ULID, time-ordered).
    pub id: UsageId,

    /// The account that was charged.
    pub user_id: UserId,

    /// The conversation the interaction belongs to, if any.
    pub conversation_id: Option<ConversationId>,

    /// Model identifier that served the request.
    pub model: String,

    /// Token count for the interaction.
    pub tokens_used: u64,

    /// Amount debited from the balance, in minor currency units.
    pub cost: i64,

    /// When the usage occurred.
    pub created_at: DateTime<Utc>,

    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UsageRecord {
    /// Create a new usage record stamped with the current time.
    #[must_use]
    pub fn new(
        user_id: UserId,
        conversation_id: Option<ConversationId>,
        model: String,
        tokens_used: u64,
        cost: i64,
    ) -> Self {
        Self {
            id: UsageId::generate(),
            user_id,
            conversation_id,
            model,
            tokens_used,
            cost,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}
