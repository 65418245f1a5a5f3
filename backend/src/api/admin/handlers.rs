//! Handler functions for administrative API endpoints.

use crate::api::common::{
    ApiError, ApiResponse, PaginatedData, PaginationFilter, PaginationMeta, service_error_to_http,
};
use crate::database::models::UserSummary;
use crate::state::AppState;
use crate::utils::jwt::Claims;
use axum::extract::{Extension, Json, Path, Query};
use serde::Serialize;

/// Totals shown on the admin dashboard
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_users: u64,
    /// Clients currently holding rate-limit history
    pub rate_limited_clients: usize,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_seconds: u64,
}

/// Lists live users, one page at a time.
#[axum::debug_handler]
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Query(pagination): Query<PaginationFilter>,
) -> Result<Json<ApiResponse<PaginatedData<UserSummary>>>, ApiError> {
    let (users, total) = state
        .users
        .list_users(&pagination)
        .await
        .map_err(service_error_to_http)?;

    let items = users.iter().map(UserSummary::from).collect();
    Ok(Json(ApiResponse::paginated(
        PaginatedData::new(items, total),
        PaginationMeta::from_filter(&pagination, total),
        "Users retrieved successfully",
    )))
}

/// Retrieves a user by its ID.
#[axum::debug_handler]
pub async fn get_user(
    Extension(state): Extension<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let user = state
        .users
        .get_user_required(id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        UserSummary::from(&user),
        "User retrieved successfully",
    )))
}

/// Soft-deletes a user. Their refresh token stops working immediately.
#[axum::debug_handler]
pub async fn deactivate_user(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    tracing::info!("User {} deactivating user {}", claims.sub, id);

    state
        .users
        .deactivate_user(claims.user_id, id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success((), "User deactivated")))
}

#[axum::debug_handler]
pub async fn dashboard(
    Extension(state): Extension<AppState>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let total_users = state
        .users
        .count_users()
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::ok(DashboardSummary {
        total_users,
        rate_limited_clients: state.rate_limiter.tracked_keys(),
        rate_limit_max_requests: state.rate_limiter.max_requests(),
        rate_limit_window_seconds: state.rate_limiter.retry_after().as_secs(),
    })))
}
