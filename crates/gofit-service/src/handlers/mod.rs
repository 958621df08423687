//! HTTP request handlers.

pub mod accounts;
pub mod chat;
pub mod health;
pub mod transactions;
pub mod usage;
pub mod webhooks;
