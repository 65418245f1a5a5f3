//! Central module for organizing the application's API endpoints.
//!
//! `app_router` assembles the auth and admin routers, puts the whole tree
//! behind the rate limiter and attaches the shared [`AppState`].

pub mod admin;
pub mod common;

use crate::api::common::ApiResponse;
use crate::auth::routes::auth_router;
use crate::rate_limit::middleware::rate_limit;
use crate::state::AppState;
use axum::{Extension, Json, Router, middleware, routing::get};

/// Builds the full application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .nest("/auth", auth_router())
        .nest("/api/admin", admin::routes::admin_router())
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ))
        .layer(Extension(state))
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "Veza Backend",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        "Welcome to the Veza API",
    ))
}
