//! In-memory store doubles for tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{DuplicateUser, PrincipalStore, RefreshTokenStore};
use crate::api::common::PaginationFilter;
use crate::database::models::{CreateUser, RefreshTokenRecord, User};

#[derive(Default)]
pub struct InMemoryPrincipalStore {
    users: Mutex<Vec<User>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct mutation hook for tests.
    pub fn update<F: FnOnce(&mut User)>(&self, id: i64, f: F) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            f(user);
        }
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id && !u.is_deleted).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.email == email && !u.is_deleted)
            .cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.username == username && !u.is_deleted)
            .cloned())
    }

    async fn create_user(&self, user: CreateUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(DuplicateUser.into());
        }
        let created = User {
            id: users.len() as i64 + 1,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            last_seen_at: None,
            created_at: user.created_at,
            updated_at: user.created_at,
            is_deleted: false,
            deleted_at: None,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn touch_last_seen(&self, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
        self.update(id, |u| u.last_seen_at = Some(seen_at));
        Ok(())
    }

    async fn list_users(&self, pagination: &PaginationFilter) -> Result<Vec<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .filter(|u| !u.is_deleted)
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count_users(&self) -> Result<u64> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().filter(|u| !u.is_deleted).count() as u64)
    }

    async fn soft_delete_user(&self, id: i64, deleted_at: DateTime<Utc>) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id && !u.is_deleted) {
            Some(user) => {
                user.is_deleted = true;
                user.is_active = false;
                user.deleted_at = Some(deleted_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Refresh-token store keyed by user id; can be switched into a failing mode.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    rows: Mutex<HashMap<i64, RefreshTokenRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn upsert_for_user(&self, record: RefreshTokenRecord) -> Result<()> {
        self.check()?;
        self.rows.lock().unwrap().insert(record.user_id, record);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().find(|r| r.token == token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<()> {
        self.check()?;
        self.rows.lock().unwrap().retain(|_, r| r.token != token);
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, r| r.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}
