//! Column family layout for the `RocksDB` database.

/// Column family names.
pub mod cf {
    /// Account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Transaction records, keyed by `transaction_id`.
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by
    /// `user_id || created_at_millis || transaction_id`. Value is empty.
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Index: payment code -> `transaction_id`. Enforces code uniqueness
    /// among live transactions and backs webhook lookup.
    pub const TRANSACTIONS_BY_CODE: &str = "transactions_by_code";

    /// AI usage records, keyed by `usage_id` (ULID).
    pub const USAGE_RECORDS: &str = "usage_records";

    /// Index: usage records by user, keyed by `user_id || usage_id`.
    /// ULIDs are time-ordered, so the index iterates chronologically.
    pub const USAGE_BY_USER: &str = "usage_by_user";

    /// Conversation records, keyed by `conversation_id`.
    pub const CONVERSATIONS: &str = "conversations";

    /// Index: conversations by user, keyed by `user_id || conversation_id`.
    pub const CONVERSATIONS_BY_USER: &str = "conversations_by_user";

    /// Chat messages, keyed by `conversation_id || message_id`.
    pub const MESSAGES: &str = "messages";
}

/// All column family names, for database initialisation.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::TRANSACTIONS_BY_CODE,
        cf::USAGE_RECORDS,
        cf::USAGE_BY_USER,
        cf::CONVERSATIONS,
        cf::CONVERSATIONS_BY_USER,
        cf::MESSAGES,
    ]
}
