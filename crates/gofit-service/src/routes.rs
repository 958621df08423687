//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, chat, health, transactions, usage, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for the authenticated API.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /webhooks/bank` - Bank transfer notifications
///
/// ## Accounts (bearer auth)
/// - `POST /v1/accounts` - Register account
/// - `GET /v1/accounts/me` - Current user's account
/// - `DELETE /v1/accounts/me` - Soft-delete account
/// - `GET /v1/users/{user_id}/balance` - Reconciled balance (admin or self)
///
/// ## Transactions (bearer auth)
/// - `POST /v1/transactions` - Create pending transaction + QR payload
/// - `GET /v1/transactions` - List with filters and pagination
/// - `GET /v1/transactions/{id}` - Fetch one
/// - `PUT /v1/transactions/{id}/status` - Status update (admin)
/// - `DELETE /v1/transactions/{id}` - Soft delete (admin)
///
/// ## Usage (bearer auth)
/// - `GET /v1/usage` - Usage history
/// - `GET /v1/usage/stats` - Usage statistics
///
/// ## Chat (bearer auth)
/// - `POST /v1/conversations` - Create conversation
/// - `GET /v1/conversations` - List conversations
/// - `GET /v1/conversations/{id}/messages` - Message history
/// - `POST /v1/conversations/{id}/messages` - Ask the assistant
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::register_account))
        .route("/accounts/me", get(accounts::get_account))
        .route("/accounts/me", delete(accounts::delete_account))
        .route("/users/:user_id/balance", get(accounts::get_user_balance))
        // Transactions
        .route("/transactions", post(transactions::create_transaction))
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/:transaction_id", get(transactions::get_transaction))
        .route(
            "/transactions/:transaction_id/status",
            put(transactions::update_transaction_status),
        )
        .route(
            "/transactions/:transaction_id",
            delete(transactions::delete_transaction),
        )
        // Usage
        .route("/usage", get(usage::list_usage))
        .route("/usage/stats", get(usage::usage_stats))
        // Chat
        .route("/conversations", post(chat::create_conversation))
        .route("/conversations", get(chat::list_conversations))
        .route(
            "/conversations/:conversation_id/messages",
            get(chat::list_messages),
        )
        .route("/conversations/:conversation_id/messages", post(chat::ask))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Webhooks (no concurrency limit - the bank controls delivery rate)
        .route("/webhooks/bank", post(webhooks::bank_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
