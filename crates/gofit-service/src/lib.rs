//! GoFit HTTP API service.
//!
//! This crate provides the HTTP API for the GoFit wallet and AI chat
//! backend:
//!
//! - Account registration and balance reconciliation
//! - Wallet transactions with QR payment payloads
//! - Bank webhook reconciliation
//! - AI chat with metered premium-model billing
//!
//! # Authentication
//!
//! Requests carry HS256 bearer tokens; the bank webhook is public and relies
//! on code/amount matching (plus an optional HMAC signature).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing consistency

pub mod ai;
pub mod auth;
pub mod bank;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use ai::{CompletionClient, CompletionError};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
