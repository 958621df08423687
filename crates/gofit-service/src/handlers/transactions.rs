//! Wallet transaction handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gofit_core::{Transaction, TransactionId, TransactionStatus};
use gofit_store::{Store, TransactionFilter};

use crate::auth::AuthUser;
use crate::bank;
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for listings.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Create transaction request.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Positive amount in minor currency units.
    pub amount: i64,
    /// Payment channel tag.
    pub payment_method: String,
    /// Opaque caller payload.
    #[serde(default)]
    pub additional_data: serde_json::Value,
}

/// Create transaction response: the pending transaction plus the QR payload
/// the client renders for the bank transfer.
#[derive(Debug, Serialize)]
pub struct CreateTransactionResponse {
    /// The created transaction.
    pub transaction: Transaction,
    /// VietQR image URL embedding the payment reference.
    pub qr_image_url: String,
}

/// Create a new pending transaction for the calling principal.
///
/// No balance is credited here; funds land only when the payment is
/// confirmed (webhook or explicit status update).
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<Json<CreateTransactionResponse>, ApiError> {
    if body.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }
    if body.payment_method.trim().is_empty() {
        return Err(ApiError::BadRequest("Payment method is required".into()));
    }

    // The owner must be a registered, live account.
    let owner = auth.account(&state)?;

    let transaction = Transaction::pending(
        owner.user_id,
        body.amount,
        body.payment_method,
        body.additional_data,
    );

    state.store.insert_transaction(&transaction).map_err(|e| {
        tracing::error!(user_id = %owner.user_id, error = %e, "Failed to create transaction");
        ApiError::Internal("Failed to create transaction".into())
    })?;

    let qr_image_url = bank::qr_image_url(&state.config, transaction.amount, &transaction.code);

    tracing::info!(
        user_id = %owner.user_id,
        transaction_id = %transaction.id,
        code = %transaction.code,
        amount = %transaction.amount,
        "Transaction created"
    );

    Ok(Json(CreateTransactionResponse {
        transaction,
        qr_image_url,
    }))
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    /// Admin only: restrict to one user.
    pub user_id: Option<gofit_core::UserId>,
    /// Restrict to one status (wire integer).
    pub status: Option<u8>,
    /// Restrict to one payment method.
    pub payment_method: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size.
    pub page_size: Option<usize>,
}

/// One page of transactions.
#[derive(Debug, Serialize)]
pub struct TransactionPageResponse {
    /// The page of transactions, newest first.
    pub results: Vec<Transaction>,
    /// Total pages at the requested page size.
    pub total_page: usize,
    /// Total matching transactions.
    pub total_transactions: usize,
}

/// List transactions. Admins see every user's and may filter by `user_id`;
/// regular users are always scoped to their own.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionPageResponse>, ApiError> {
    let caller = auth.account(&state)?;

    let status = query
        .status
        .map(TransactionStatus::try_from)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user_id = if caller.is_admin() {
        query.user_id
    } else {
        Some(caller.user_id)
    };

    let filter = TransactionFilter {
        user_id,
        status,
        payment_method: query.payment_method,
    };

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let listing = state
        .store
        .list_transactions(&filter, page_size, (page - 1) * page_size)?;

    Ok(Json(TransactionPageResponse {
        total_page: listing.total.div_ceil(page_size),
        total_transactions: listing.total,
        results: listing.results,
    }))
}

/// Get a single transaction. Admins may fetch any; regular users only their
/// own.
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, ApiError> {
    let caller = auth.account(&state)?;

    let transaction = state
        .store
        .get_transaction(&transaction_id)?
        .ok_or_else(|| ApiError::NotFound(format!("transaction not found: {transaction_id}")))?;

    if !caller.is_admin() && transaction.user_id != caller.user_id {
        return Err(ApiError::Forbidden(
            "You can only view your own transactions".into(),
        ));
    }

    Ok(Json(transaction))
}

/// Status update request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status (wire integer, 0..=3).
    pub status: u8,
}

/// Update a transaction's status (admin only).
///
/// Completing a transaction credits the owner's balance exactly once;
/// repeating the request is a no-op, and moving a completed transaction to
/// any other status is rejected.
pub async fn update_transaction_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(transaction_id): Path<TransactionId>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Transaction>, ApiError> {
    auth.admin_account(&state)?;

    let status = TransactionStatus::try_from(body.status)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state
        .store
        .update_transaction_status(&transaction_id, status)?;

    if let Some(credited) = outcome.credited {
        tracing::info!(
            transaction_id = %transaction_id,
            credited = %credited,
            new_balance = ?outcome.new_balance,
            "Transaction completed, balance credited"
        );
    } else {
        tracing::info!(
            transaction_id = %transaction_id,
            status = %status,
            already_completed = %outcome.already_completed,
            "Transaction status updated"
        );
    }

    Ok(Json(outcome.transaction))
}

/// Soft-delete a transaction (admin only).
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.admin_account(&state)?;

    state.store.soft_delete_transaction(&transaction_id)?;

    tracing::info!(transaction_id = %transaction_id, "Transaction deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
