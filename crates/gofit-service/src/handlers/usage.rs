//! AI usage history and statistics handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gofit_core::{ConversationId, UsageRecord, UserId};
use gofit_store::{Store, UsageFilter};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for listings.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Usage listing query parameters.
#[derive(Debug, Deserialize)]
pub struct UsageListQuery {
    /// Admin only: restrict to one user.
    pub user_id: Option<UserId>,
    /// Restrict to one model.
    pub model: Option<String>,
    /// Restrict to one conversation.
    pub conversation_id: Option<ConversationId>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size.
    pub page_size: Option<usize>,
}

/// One page of usage records.
#[derive(Debug, Serialize)]
pub struct UsagePageResponse {
    /// The page of records, newest first.
    pub results: Vec<UsageRecord>,
    /// Total pages at the requested page size.
    pub total_page: usize,
    /// Total matching records.
    pub total_usage: usize,
}

/// List usage records. Admins may list any user's (or everyone's); regular
/// users are always scoped to their own.
pub async fn list_usage(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<UsageListQuery>,
) -> Result<Json<UsagePageResponse>, ApiError> {
    let caller = auth.account(&state)?;

    let user_id = if caller.is_admin() {
        query.user_id
    } else {
        Some(caller.user_id)
    };

    let filter = UsageFilter {
        user_id,
        model: query.model,
        conversation_id: query.conversation_id,
    };

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let listing = state
        .store
        .list_usage(&filter, page_size, (page - 1) * page_size)?;

    Ok(Json(UsagePageResponse {
        total_page: listing.total.div_ceil(page_size),
        total_usage: listing.total,
        results: listing.results,
    }))
}

/// Stats query parameters.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Admin only: stats for one user. Omitted: global stats (admin) or the
    /// caller's own (regular user).
    pub user_id: Option<UserId>,
}

/// Usage statistics response.
#[derive(Debug, Serialize)]
pub struct UsageStatsResponse {
    /// The queried user, when scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Sum of cost over matching records.
    pub total_cost: i64,
    /// Number of matching records.
    pub usage_count: usize,
    /// Distinct users with usage (global stats only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<usize>,
    /// The queried user's stored balance (scoped stats only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<i64>,
}

/// Aggregate usage statistics.
pub async fn usage_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<UsageStatsResponse>, ApiError> {
    let caller = auth.account(&state)?;

    let scope = if caller.is_admin() {
        query.user_id
    } else {
        Some(caller.user_id)
    };

    let stats = state.store.usage_stats(scope.as_ref())?;

    Ok(Json(UsageStatsResponse {
        user_id: scope.map(|id| id.to_string()),
        total_cost: stats.total_cost,
        usage_count: stats.usage_count,
        total_users: stats.distinct_users,
        current_balance: stats.current_balance,
    }))
}
