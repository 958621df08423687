//! Account types for the GoFit wallet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A user account with its wallet balance.
///
/// `balance` is a stored running total in minor currency units, mutated only
/// by the store's locked credit/debit operations. It must be non-negative
/// after every mutation; the store rejects any change that would violate
/// this before committing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The owning user.
    pub user_id: UserId,

    /// Role tag controlling access to admin-only ledger views.
    pub role: Role,

    /// Current wallet balance in minor currency units.
    pub balance: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker. A deleted account reads as absent.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new regular account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self::with_role(user_id, Role::Regular)
    }

    /// Create a new account with an explicit role.
    #[must_use]
    pub fn with_role(user_id: UserId, role: Role) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            role,
            balance: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check whether the balance covers a debit of `amount`.
    #[must_use]
    pub fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Check whether the account is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check whether the account holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including other users' ledgers.
    Admin,

    /// A normal registered user.
    Regular,

    /// A guest account with no persistent profile.
    Guest,
}
