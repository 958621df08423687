//! Wallet transaction types.
//!
//! A `Transaction` is one funding attempt: created `Pending`, confirmed by a
//! bank webhook or an explicit status update, and credited to the owning
//! account exactly once on completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// A wallet funding transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id.
    pub id: TransactionId,

    /// The owning account.
    pub user_id: UserId,

    /// Short token embedded in the external payment description, derived
    /// from the trailing segment of `id`. Unique among non-deleted rows.
    pub code: String,

    /// Lifecycle status.
    pub status: TransactionStatus,

    /// Positive amount in minor currency units, credited on completion.
    pub amount: i64,

    /// Free-form payment channel tag (`bank_transfer`, `credit_card`, ...).
    pub payment_method: String,

    /// Opaque caller-supplied payload.
    pub additional_data: serde_json::Value,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,

    /// When the transaction was last updated.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker. A deleted transaction reads as absent.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new pending transaction with a freshly generated id and
    /// payment code.
    #[must_use]
    pub fn pending(
        user_id: UserId,
        amount: i64,
        payment_method: String,
        additional_data: serde_json::Value,
    ) -> Self {
        let id = TransactionId::generate();
        let code = id.payment_code();
        let now = Utc::now();
        Self {
            id,
            user_id,
            code,
            status: TransactionStatus::Pending,
            amount,
            payment_method,
            additional_data,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check whether the transaction has been completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Check whether the transaction is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Transaction lifecycle status.
///
/// Serialised as the small integer the API speaks (`0..=3`), so clients and
/// stored rows never drift from the enum definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransactionStatus {
    /// Created, awaiting payment confirmation.
    Pending,

    /// Payment confirmed; the amount has been credited.
    Completed,

    /// Payment failed.
    Failed,

    /// Cancelled before confirmation.
    Cancelled,
}

impl TransactionStatus {
    /// The wire representation of this status.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Completed => 1,
            Self::Failed => 2,
            Self::Cancelled => 3,
        }
    }
}

impl TryFrom<u8> for TransactionStatus {
    type Error = InvalidStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Completed),
            2 => Ok(Self::Failed),
            3 => Ok(Self::Cancelled),
            other => Err(InvalidStatus(other)),
        }
    }
}

impl From<TransactionStatus> for u8 {
    fn from(status: TransactionStatus) -> Self {
        status.as_u8()
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Error for out-of-range status integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transaction status: {0}")]
pub struct InvalidStatus(pub u8);
