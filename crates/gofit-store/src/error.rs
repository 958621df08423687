//! Error types for the GoFit storage layer.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found (or soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record that was looked up.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Balance below the requested debit.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance in minor currency units.
        balance: i64,
        /// Required amount in minor currency units.
        required: i64,
    },

    /// A live transaction already carries this payment code.
    #[error("payment code already in use: {code}")]
    CodeCollision {
        /// The colliding code.
        code: String,
    },

    /// Attempt to move a completed transaction to another status.
    /// Credit reversal is unsupported; completed is terminal.
    #[error("transaction already completed: {id}")]
    CompletedTransition {
        /// The transaction that was already completed.
        id: String,
    },
}

impl StoreError {
    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
