//! Middleware for protecting authenticated routes and handling authorization.
//!
//! `jwt_auth` verifies the bearer token and stores the decoded [`Claims`] in
//! the request extensions. `require_permission` runs after it and checks the
//! role carried by those claims.

use crate::api::common::{ApiError, ApiResponse, auth_error_to_http};
use crate::auth::permissions::Permission;
use crate::errors::AuthError;
use crate::state::AppState;
use crate::utils::jwt::Claims;
use axum::{
    Json,
    extract::{Extension, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

const BEARER_PREFIX: &str = "Bearer ";

/// JWT authentication middleware
pub async fn jwt_auth(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error(
                "Missing bearer token",
                "missing_token",
            )),
        )
    })?;

    let claims = state
        .tokens
        .verify_access_token(token)
        .map_err(auth_error_to_http)?;

    // Add claims to request extensions for use in handlers
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Permission gate. Install with `from_fn_with_state(permission, require_permission)`
/// inside a `jwt_auth` layer.
pub async fn require_permission(
    State(permission): State<Permission>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| auth_error_to_http(AuthError::TokenMalformed))?;

    if !claims.role.has_permission(permission) {
        tracing::warn!(
            "User {} ({}) denied {:?}",
            claims.sub,
            claims.role,
            permission
        );
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Insufficient permissions",
                "permission_denied",
            )),
        ));
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }
}
