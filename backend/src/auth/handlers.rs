//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request payloads, hand them to the
//! `auth::service` for the actual work and wrap the outcome in the standard
//! response envelope.

use crate::api::common::{ApiError, ApiResponse, service_error_to_http};
use crate::auth::models::*;
use crate::state::AppState;
use crate::utils::jwt::Claims;
use axum::extract::{Extension, Json};

/// Handle user registration request
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    match state.auth.register(payload).await {
        Ok(response) => Ok(Json(ApiResponse::success(
            response,
            "User registered successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    match state.auth.login(payload).await {
        Ok(response) => Ok(Json(ApiResponse::success(response, "Login successful"))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle token refresh request
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<RefreshTokenResponse>>, ApiError> {
    match state.auth.refresh_token(payload).await {
        Ok(response) => Ok(Json(ApiResponse::success(response, "Token refreshed"))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle logout request by revoking the refresh token server-side
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    match state.auth.logout(payload).await {
        Ok(()) => Ok(Json(ApiResponse::success((), "Logged out successfully"))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Get current user information from token
#[axum::debug_handler]
pub async fn me(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state
        .auth
        .me(&claims)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::ok(user)))
}
