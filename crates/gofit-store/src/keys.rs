//! Key encodings for the `RocksDB` column families.

use chrono::{DateTime, Utc};

use gofit_core::{ConversationId, MessageId, TransactionId, UsageId, UserId};

/// Account key: `user_id` (16 bytes).
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Transaction key: `transaction_id` (16 bytes).
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.as_bytes().to_vec()
}

/// User-transaction index key.
///
/// Format: `user_id (16) || created_at_millis big-endian (8) || transaction_id (16)`.
///
/// Transaction ids are random UUIDs, so the creation timestamp is embedded to
/// keep a user's transactions iterable in chronological order.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn user_transaction_key(
    user_id: &UserId,
    created_at: DateTime<Utc>,
    transaction_id: &TransactionId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&(created_at.timestamp_millis() as u64).to_be_bytes());
    key.extend_from_slice(transaction_id.as_bytes());
    key
}

/// Prefix for iterating all transactions of a user.
#[must_use]
pub fn user_transactions_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the transaction id from a user-transaction index key.
///
/// Returns `None` if the key is shorter than the expected 40 bytes.
#[must_use]
pub fn transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let raw: [u8; 16] = key.get(24..40)?.try_into().ok()?;
    Some(TransactionId::from_uuid(uuid::Uuid::from_bytes(raw)))
}

/// Payment-code index key: the code's UTF-8 bytes.
#[must_use]
pub fn code_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Usage record key: `usage_id` (16 bytes, ULID).
#[must_use]
pub fn usage_key(usage_id: &UsageId) -> Vec<u8> {
    usage_id.to_bytes().to_vec()
}

/// User-usage index key: `user_id (16) || usage_id (16)`.
///
/// ULIDs are time-ordered, so the index iterates chronologically.
#[must_use]
pub fn user_usage_key(user_id: &UserId, usage_id: &UsageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&usage_id.to_bytes());
    key
}

/// Extract the usage id from a user-usage index key.
#[must_use]
pub fn usage_id_from_user_key(key: &[u8]) -> Option<UsageId> {
    let raw: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    Some(UsageId::from_bytes(raw))
}

/// Conversation key: `conversation_id` (16 bytes).
#[must_use]
pub fn conversation_key(conversation_id: &ConversationId) -> Vec<u8> {
    conversation_id.as_bytes().to_vec()
}

/// User-conversation index key: `user_id (16) || conversation_id (16)`.
#[must_use]
pub fn user_conversation_key(user_id: &UserId, conversation_id: &ConversationId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(conversation_id.as_bytes());
    key
}

/// Extract the conversation id from a user-conversation index key.
#[must_use]
pub fn conversation_id_from_user_key(key: &[u8]) -> Option<ConversationId> {
    let raw: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    Some(ConversationId::from_uuid(uuid::Uuid::from_bytes(raw)))
}

/// Message key: `conversation_id (16) || message_id (16)`.
///
/// Message ids are ULIDs, so a conversation's messages iterate in send order.
#[must_use]
pub fn message_key(conversation_id: &ConversationId, message_id: &MessageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(conversation_id.as_bytes());
    key.extend_from_slice(&message_id.to_bytes());
    key
}

/// Prefix for iterating all messages of a conversation.
#[must_use]
pub fn conversation_messages_prefix(conversation_id: &ConversationId) -> Vec<u8> {
    conversation_id.as_bytes().to_vec()
}
