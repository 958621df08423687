//! Account handlers: registration, self view, soft delete, and the admin
//! balance reconciliation view.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use gofit_core::{Account, Role, UserId};
use gofit_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account representation returned to clients.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Account role.
    pub role: Role,
    /// Current balance in minor currency units.
    pub balance: i64,
    /// Created timestamp (RFC 3339).
    pub created_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            role: account.role,
            balance: account.balance,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Register an account for the calling principal.
pub async fn register_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    if state.store.get_account(&auth.user_id)?.is_some() {
        return Err(ApiError::Conflict("Account already exists".into()));
    }

    let role = if state.config.admin_users.contains(&auth.user_id) {
        Role::Admin
    } else {
        Role::Regular
    };
    let account = Account::with_role(auth.user_id, role);
    state.store.put_account(&account)?;

    tracing::info!(user_id = %auth.user_id, role = ?role, "Account registered");

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = auth.account(&state)?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Soft-delete the current user's account.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.soft_delete_account(&auth.user_id)?;

    tracing::info!(user_id = %auth.user_id, "Account deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Balance reconciliation response.
///
/// `balance` is recomputed from completed transactions; `stored_balance` is
/// the running total on the account row. The two are returned side by side
/// so drift is visible to the caller.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The queried user.
    pub user_id: String,
    /// Balance recomputed from completed transactions.
    pub balance: i64,
    /// The stored running total.
    pub stored_balance: i64,
}

/// Get a user's reconciled balance. Admins may query any user; regular
/// users only themselves.
pub async fn get_user_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let caller = auth.account(&state)?;
    if !caller.is_admin() && caller.user_id != user_id {
        return Err(ApiError::Forbidden(
            "You can only view your own balance".into(),
        ));
    }

    let reconciliation = state.store.reconcile_balance(&user_id)?;

    Ok(Json(BalanceResponse {
        user_id: reconciliation.user_id.to_string(),
        balance: reconciliation.computed_balance,
        stored_balance: reconciliation.stored_balance,
    }))
}
