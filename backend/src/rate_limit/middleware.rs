//! Middleware that gates every request through the [`RateLimiter`].

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

use super::RateLimiter;
use crate::api::common::auth_error_to_http;
use crate::errors::AuthError;

const UNKNOWN_CLIENT: &str = "unknown";

/// Rejects the request with 429 once the client's window is full.
///
/// Install with `middleware::from_fn_with_state(limiter, rate_limit)`.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    if !limiter.allow(&client) {
        let retry_after_secs = limiter.retry_after().as_secs();
        warn!("Client {} rate limited", client);

        let mut response = auth_error_to_http(AuthError::RateLimited { retry_after_secs })
            .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        return response;
    }

    next.run(request).await
}

/// Peer IP, then the first `X-Forwarded-For` hop, then a shared bucket.
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    forwarded_for(request.headers()).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}
