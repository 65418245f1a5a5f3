//! Defines the HTTP routes for administration.
//!
//! Each route verifies the bearer token first, then the permission its
//! operation requires.

use super::handlers::{dashboard, deactivate_user, get_user, list_users};
use crate::auth::middleware::{jwt_auth, require_permission};
use crate::auth::permissions::Permission;
use axum::{
    Router, middleware,
    routing::{MethodRouter, delete, get},
};

fn guarded(route: MethodRouter, permission: Permission) -> MethodRouter {
    route
        .layer(middleware::from_fn_with_state(permission, require_permission))
        .layer(middleware::from_fn(jwt_auth))
}

pub fn admin_router() -> Router {
    Router::new()
        .route("/users", guarded(get(list_users), Permission::ViewUsers))
        .route(
            "/users/{id}",
            guarded(get(get_user), Permission::ViewUsers)
                .merge(guarded(delete(deactivate_user), Permission::ManageUsers)),
        )
        .route(
            "/dashboard",
            guarded(get(dashboard), Permission::ViewDashboard),
        )
}
