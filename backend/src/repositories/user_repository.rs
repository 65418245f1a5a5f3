//! Database repository for user management operations.
//!
//! Provides the principal lookups the auth flow needs plus the admin listing
//! and soft-delete operations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{DuplicateUser, PrincipalStore};
use crate::api::common::PaginationFilter;
use crate::database::models::{CreateUser, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_active, last_seen_at, \
                            created_at, updated_at, is_deleted, deleted_at";

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - SQLite connection pool (cheap to clone)
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} = ? AND is_deleted = 0",
            USER_COLUMNS, clause
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl PrincipalStore for UserRepository {
    /// Retrieves a user by their unique identifier.
    ///
    /// # Returns
    /// `Some(User)` if found and not deleted, `None` otherwise
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = ? AND is_deleted = 0",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_where("email", email).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_where("username", username).await
    }

    /// Creates a new user in the database.
    ///
    /// # Returns
    /// The newly created User with all fields populated
    async fn create_user(&self, user: CreateUser) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (
                username, email, password_hash, role, is_active,
                created_at, updated_at, is_deleted
            )
            VALUES (?, ?, ?, ?, 1, ?, ?, 0)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.created_at)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    anyhow::Error::new(DuplicateUser)
                }
                other => other.into(),
            })?;

        Ok(created)
    }

    async fn touch_last_seen(&self, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_seen_at = ?, updated_at = ? WHERE id = ?")
            .bind(seen_at)
            .bind(seen_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_users(&self, pagination: &PaginationFilter) -> Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {} FROM users
            WHERE is_deleted = 0
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Get total count of live users
    async fn count_users(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_deleted = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn soft_delete_user(&self, id: i64, deleted_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_deleted = 1, is_active = 0, deleted_at = ?, updated_at = ?
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(deleted_at)
        .bind(deleted_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
