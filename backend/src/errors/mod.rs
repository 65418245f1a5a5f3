//! Global application error types.
//!
//! This module defines the authentication error taxonomy shared by the token
//! service, the rate limiter and the HTTP layer, plus the generic
//! `ServiceError` returned by business services.

use thiserror::Error;

/// Represents failures of the token service and request gating.
///
/// A malformed token and an expired token are distinct so callers can
/// choose between a silent refresh and a full re-login.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Structurally invalid token, unexpected signing algorithm, bad
    /// signature or wrong token type.
    #[error("Token is malformed or has an invalid signature")]
    TokenMalformed,
    /// Valid signature, expiry in the past.
    #[error("Token has expired")]
    TokenExpired,
    /// No matching persisted refresh token, or expired, or principal inactive.
    #[error("Refresh token is invalid")]
    RefreshTokenInvalid,
    /// The backing store failed or timed out. Safe to retry with backoff.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    /// Request rejected by the sliding-window limiter.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Token signing failed: {0}")]
    TokenSigning(String),
}

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Flattens `validator` output into a single readable message.
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
