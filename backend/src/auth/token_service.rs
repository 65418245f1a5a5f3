//! Access/refresh token lifecycle.
//!
//! Access tokens are stateless: validity is decided by signature, algorithm,
//! token type and expiry alone, so there is no server-side revocation of an
//! access token before its `exp`. Refresh tokens are persisted, one row per
//! principal; issuing a new one overwrites the previous row.
//!
//! Consuming a refresh token does not delete it. It stays usable until it
//! expires, is replaced by a later login, or is revoked at logout.
//!
//! This service never logs; every failure is returned as an [`AuthError`].

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

use crate::auth::models::{AccessToken, Principal, TokenPair};
use crate::config::AuthConfig;
use crate::database::models::RefreshTokenRecord;
use crate::errors::AuthError;
use crate::repositories::{PrincipalStore, RefreshTokenStore};
use crate::utils::clock::Clock;
use crate::utils::generate_random_string::generate_random_string;
use crate::utils::jwt::{Claims, JwtUtils, TokenType};

const REFRESH_TOKEN_ID_LENGTH: usize = 32;

pub struct TokenService {
    jwt: JwtUtils,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    principals: Arc<dyn PrincipalStore>,
    clock: Arc<dyn Clock>,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
    store_timeout: std::time::Duration,
}

impl TokenService {
    pub fn new(
        config: &AuthConfig,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        principals: Arc<dyn PrincipalStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jwt: JwtUtils::new(config.jwt_secret.as_bytes()),
            refresh_tokens,
            principals,
            clock,
            access_ttl_seconds: config.access_token_ttl_seconds,
            refresh_ttl_seconds: config.refresh_token_ttl_seconds,
            store_timeout: config.store_timeout(),
        }
    }

    /// Signs a short-lived access token for `principal`.
    pub fn issue_access_token(&self, principal: &Principal) -> Result<AccessToken, AuthError> {
        let now = self.clock.now().timestamp();
        let claims = Self::claims_for(
            principal,
            TokenType::Access,
            None,
            now,
            self.access_ttl_seconds,
        )?;

        Ok(AccessToken {
            token: self.jwt.encode(&claims)?,
            expires_in: self.access_ttl_seconds,
        })
    }

    /// Mints an access token and a refresh token. Nothing is persisted; the
    /// caller follows up with [`TokenService::rotate_refresh_token`].
    pub fn issue_token_pair(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let access = self.issue_access_token(principal)?;

        let now = self.clock.now().timestamp();
        let claims = Self::claims_for(
            principal,
            TokenType::Refresh,
            Some(generate_random_string(REFRESH_TOKEN_ID_LENGTH)),
            now,
            self.refresh_ttl_seconds,
        )?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: self.jwt.encode(&claims)?,
            expires_in: access.expires_in,
        })
    }

    /// Verifies signature, algorithm, token type and expiry.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.jwt.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::TokenMalformed);
        }
        if claims.is_expired_at(self.clock.now().timestamp()) {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    /// Persists `token` as the only live refresh token of `principal_id`,
    /// overwriting any previous one. Last writer wins.
    pub async fn rotate_refresh_token(
        &self,
        principal_id: i64,
        token: &str,
    ) -> Result<(), AuthError> {
        let now = self.now_seconds();
        let record = RefreshTokenRecord {
            user_id: principal_id,
            token: token.to_string(),
            expires_at: seconds_to_datetime(expiry(now, self.refresh_ttl_seconds)?)?,
            created_at: seconds_to_datetime(now)?,
        };

        self.with_store(self.refresh_tokens.upsert_for_user(record))
            .await
    }

    /// Resolves a refresh token to its principal without deleting it.
    pub async fn consume_refresh_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self
            .jwt
            .decode(token)
            .map_err(|_| AuthError::RefreshTokenInvalid)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::RefreshTokenInvalid);
        }

        let record = self
            .with_store(self.refresh_tokens.find_by_token(token))
            .await?
            .ok_or(AuthError::RefreshTokenInvalid)?;

        if record.expires_at <= self.clock.now() {
            return Err(AuthError::RefreshTokenInvalid);
        }

        let user = self
            .with_store(self.principals.get_user_by_id(record.user_id))
            .await?
            .ok_or(AuthError::RefreshTokenInvalid)?;

        if !user.is_enabled() {
            return Err(AuthError::RefreshTokenInvalid);
        }

        Ok(Principal::from(&user))
    }

    /// Deletes the refresh token. Unknown tokens are not an error.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), AuthError> {
        self.with_store(self.refresh_tokens.delete_by_token(token))
            .await
    }

    /// Exchanges a refresh token for a fresh access token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessToken, AuthError> {
        let principal = self.consume_refresh_token(refresh_token).await?;
        self.issue_access_token(&principal)
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.revoke_refresh_token(refresh_token).await
    }

    /// Removes persisted refresh tokens that have already expired.
    pub async fn purge_expired_refresh_tokens(&self) -> Result<u64, AuthError> {
        let now = seconds_to_datetime(self.now_seconds())?;
        self.with_store(self.refresh_tokens.delete_expired(now))
            .await
    }

    fn claims_for(
        principal: &Principal,
        token_type: TokenType,
        jti: Option<String>,
        now: i64,
        ttl_seconds: u64,
    ) -> Result<Claims, AuthError> {
        Ok(Claims {
            sub: principal.username.clone(),
            user_id: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            token_type,
            jti,
            exp: expiry(now, ttl_seconds)?,
            iat: now,
        })
    }

    fn now_seconds(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Bounds a store call by the configured timeout.
    async fn with_store<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AuthError::StoreUnavailable(e.to_string())),
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "store call timed out after {:?}",
                self.store_timeout
            ))),
        }
    }
}

/// `now + ttl_seconds`, or an error when it leaves the timestamp range.
fn expiry(now: i64, ttl_seconds: u64) -> Result<i64, AuthError> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| {
            AuthError::TokenSigning(format!("lifetime {}s out of range", ttl_seconds))
        })
}

// Stored timestamps are whole seconds so they compare cleanly as text.
fn seconds_to_datetime(seconds: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| AuthError::TokenSigning(format!("timestamp {} out of range", seconds)))
}
