//! Persistence collaborators used by the auth core.
//!
//! The traits let the token service and user service run against SQLite in
//! production and against in-memory doubles in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::common::PaginationFilter;
use crate::database::models::{CreateUser, RefreshTokenRecord, User};

pub mod refresh_token_repository;
pub mod user_repository;

#[cfg(test)]
pub mod memory;

/// `create_user` hit a username or email already held by some row,
/// logically deleted ones included.
#[derive(Debug, thiserror::Error)]
#[error("username or email already taken")]
pub struct DuplicateUser;

/// Principal lookup and persistence. Lookups skip logically deleted rows.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Fails with [`DuplicateUser`] when the username or email is taken.
    async fn create_user(&self, user: CreateUser) -> Result<User>;

    async fn touch_last_seen(&self, id: i64, seen_at: DateTime<Utc>) -> Result<()>;

    async fn list_users(&self, pagination: &PaginationFilter) -> Result<Vec<User>>;

    async fn count_users(&self) -> Result<u64>;

    /// Marks the user deleted. Returns `false` when no live row matched.
    async fn soft_delete_user(&self, id: i64, deleted_at: DateTime<Utc>) -> Result<bool>;
}

/// Server-side refresh tokens, one row per principal.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Inserts or overwrites the row for `record.user_id`.
    async fn upsert_for_user(&self, record: RefreshTokenRecord) -> Result<()>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Deletes the matching row; absence is not an error.
    async fn delete_by_token(&self, token: &str) -> Result<()>;

    /// Deletes rows with `expires_at <= now` and returns how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
