//! `RocksDB` storage layer for the GoFit wallet and AI chat backend.
//!
//! The [`Store`] trait defines every database operation; [`RocksStore`] is
//! the production implementation. Compound ledger operations — crediting a
//! transaction on completion, debiting for AI usage, reconciling the stored
//! balance against the transaction log — live here rather than in the HTTP
//! layer so their invariants are enforced in one place:
//!
//! - a transaction is credited **at most once**, no matter how many status
//!   updates or webhook deliveries arrive for it;
//! - a debit and its usage record commit together or not at all;
//! - all balance mutations for one account are serialised through a
//!   per-account lock, held across the read-modify-write and released after
//!   the atomic batch commits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use gofit_core::{
    Account, ChatMessage, Conversation, ConversationId, Transaction, TransactionId,
    TransactionStatus, UsageRecord, UserId,
};

/// Filter for transaction listings.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one user's transactions.
    pub user_id: Option<UserId>,
    /// Restrict to one status.
    pub status: Option<TransactionStatus>,
    /// Restrict to one payment method.
    pub payment_method: Option<String>,
}

/// One page of a transaction listing, newest first.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    /// The page of transactions.
    pub results: Vec<Transaction>,
    /// Total matching transactions across all pages.
    pub total: usize,
}

/// Outcome of a status update.
#[derive(Debug, Clone)]
pub struct StatusOutcome {
    /// The transaction after the update.
    pub transaction: Transaction,
    /// Amount credited to the account, if this update completed the
    /// transaction. `None` for non-crediting transitions and idempotent
    /// replays.
    pub credited: Option<i64>,
    /// Account balance after the credit, if one was applied.
    pub new_balance: Option<i64>,
    /// True when the transaction was already completed and the request was a
    /// no-op replay.
    pub already_completed: bool,
}

/// Filter for usage listings.
#[derive(Debug, Clone, Default)]
pub struct UsageFilter {
    /// Restrict to one user (admin listings only; user listings are already
    /// scoped).
    pub user_id: Option<UserId>,
    /// Restrict to one model.
    pub model: Option<String>,
    /// Restrict to one conversation.
    pub conversation_id: Option<ConversationId>,
}

/// One page of a usage listing, newest first.
#[derive(Debug, Clone)]
pub struct UsagePage {
    /// The page of usage records.
    pub results: Vec<UsageRecord>,
    /// Total matching records across all pages.
    pub total: usize,
}

/// Aggregated usage statistics.
#[derive(Debug, Clone)]
pub struct UsageStats {
    /// Sum of `cost` over matching records.
    pub total_cost: i64,
    /// Number of matching records.
    pub usage_count: usize,
    /// Distinct users with usage (global stats only).
    pub distinct_users: Option<usize>,
    /// The queried user's stored balance (per-user stats only).
    pub current_balance: Option<i64>,
}

/// Reconciliation view of one account's balance.
///
/// `computed_balance` is recomputed from the completed transaction log;
/// `stored_balance` is the running total on the account row. The two should
/// agree; a difference indicates drift worth investigating.
#[derive(Debug, Clone)]
pub struct BalanceReconciliation {
    /// The account in question.
    pub user_id: UserId,
    /// Sum of `amount` over completed, non-deleted transactions.
    pub computed_balance: i64,
    /// The stored running total.
    pub stored_balance: i64,
}

/// The storage trait defining all database operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get a live (non-deleted) account by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Soft-delete an account. The row is kept for referential integrity of
    /// its transactions and usage records.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist or is
    /// already deleted.
    fn soft_delete_account(&self, user_id: &UserId) -> Result<()>;

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Insert a new transaction, maintaining the user and code indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CodeCollision` if a live transaction already
    /// carries the same payment code.
    fn insert_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Get a live (non-deleted) transaction by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>>;

    /// Look up a live transaction by its payment code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_transaction_by_code(&self, code: &str) -> Result<Option<Transaction>>;

    /// List transactions matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage>;

    /// Soft-delete a transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the transaction doesn't exist or is
    /// already deleted.
    fn soft_delete_transaction(&self, transaction_id: &TransactionId) -> Result<()>;

    /// Apply a status transition, crediting the owner's balance when the
    /// transaction moves into `Completed`.
    ///
    /// The full state machine runs under the owner's account lock:
    ///
    /// - `Completed -> Completed` is an idempotent no-op (`already_completed`
    ///   set, balance untouched);
    /// - `Completed -> anything else` is rejected with
    ///   `StoreError::CompletedTransition` — credit reversal is unsupported;
    /// - `* -> Completed` credits `amount` and flips the status in one atomic
    ///   batch;
    /// - any other transition is a plain status update.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the transaction or its account is absent or
    /// soft-deleted; `StoreError::CompletedTransition` as above.
    fn update_transaction_status(
        &self,
        transaction_id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<StatusOutcome>;

    // =========================================================================
    // Usage metering
    // =========================================================================

    /// Debit `record.cost` from the owner's balance and persist the usage
    /// record, atomically and under the account lock.
    ///
    /// Returns the balance after the debit.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist;
    /// - `StoreError::InsufficientFunds` if the balance is below `cost` — in
    ///   that case neither the debit nor the record is applied.
    fn debit_usage(&self, record: &UsageRecord) -> Result<i64>;

    /// List usage records matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage(&self, filter: &UsageFilter, limit: usize, offset: usize) -> Result<UsagePage>;

    /// Aggregate usage statistics, per-user when `user_id` is given, global
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn usage_stats(&self, user_id: Option<&UserId>) -> Result<UsageStats>;

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Insert or update a conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Get a live conversation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_conversation(&self, conversation_id: &ConversationId) -> Result<Option<Conversation>>;

    /// List a user's live conversations, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_conversations(&self, user_id: &UserId) -> Result<Vec<Conversation>>;

    /// Append a message and bump the conversation's `updated_at`, atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the conversation is absent or
    /// soft-deleted.
    fn append_message(&self, message: &ChatMessage) -> Result<()>;

    /// List a conversation's messages in send order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>>;

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Recompute an account's balance from its completed transactions and
    /// return it next to the stored running total. Read-only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn reconcile_balance(&self, user_id: &UserId) -> Result<BalanceReconciliation>;
}
