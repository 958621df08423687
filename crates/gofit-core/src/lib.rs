//! Core types for the GoFit wallet and AI chat backend.
//!
//! This crate provides the foundational types used throughout the GoFit ledger:
//!
//! - **Identifiers**: `UserId`, `TransactionId`, `ConversationId`, `UsageId`, `MessageId`
//! - **Accounts**: `Account`, `Role`
//! - **Transactions**: `Transaction`, `TransactionStatus`
//! - **Usage**: `UsageRecord`
//! - **Chat**: `Conversation`, `ChatMessage`, `MessageSender`
//!
//! # Money
//!
//! All monetary amounts (`balance`, `amount`, `cost`) are `i64` minor currency
//! units. Storing integers avoids floating point drift in the running balance;
//! the only place a decimal appears is the bank webhook payload, which is
//! compared against the stored integer with a fixed absolute tolerance.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod chat;
pub mod ids;
pub mod transaction;
pub mod usage;

pub use account::{Account, Role};
pub use chat::{ChatMessage, Conversation, MessageSender};
pub use ids::{ConversationId, IdError, MessageId, TransactionId, UsageId, UserId};
pub use transaction::{InvalidStatus, Transaction, TransactionStatus};
pub use usage::UsageRecord;
