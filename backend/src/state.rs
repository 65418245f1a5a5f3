//! Shared application state handed to every handler through an `Extension`.

use std::sync::Arc;

use crate::auth::service::AuthService;
use crate::auth::token_service::TokenService;
use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::repositories::{PrincipalStore, RefreshTokenStore};
use crate::services::user_service::UserService;
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wires services to their stores.
    ///
    /// # Arguments
    /// * `config` - Loaded application configuration
    /// * `principals` - User persistence
    /// * `refresh_tokens` - Refresh token persistence
    /// * `clock` - Time source shared by every service
    pub fn new(
        config: &Config,
        principals: Arc<dyn PrincipalStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let users = Arc::new(UserService::new(
            principals.clone(),
            clock.clone(),
            config.auth.bcrypt_cost,
        ));
        let tokens = Arc::new(TokenService::new(
            &config.auth,
            refresh_tokens,
            principals,
            clock.clone(),
        ));
        let auth = Arc::new(AuthService::new(users.clone(), tokens.clone()));
        let rate_limiter = RateLimiter::new(&config.rate_limit, clock);

        Self {
            users,
            auth,
            tokens,
            rate_limiter,
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::config::{AuthConfig, RateLimitConfig};
    use crate::repositories::memory::{InMemoryPrincipalStore, InMemoryRefreshTokenStore};
    use crate::utils::clock::ManualClock;

    pub struct TestState {
        pub state: AppState,
        pub principals: Arc<InMemoryPrincipalStore>,
        pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
        pub clock: Arc<ManualClock>,
    }

    pub fn test_config(max_requests: usize) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            server_port: 0,
            refresh_token_purge_interval_seconds: 3600,
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                access_token_ttl_seconds: 3600,
                refresh_token_ttl_seconds: 604_800,
                bcrypt_cost: 4,
                store_timeout_seconds: 5,
            },
            rate_limit: RateLimitConfig {
                max_requests,
                window_seconds: 60,
                sweep_interval_seconds: 60,
            },
        }
    }

    /// State backed by in-memory stores and a manual clock.
    pub fn test_state(max_requests: usize) -> TestState {
        let principals = Arc::new(InMemoryPrincipalStore::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
        let clock = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
        let state = AppState::new(
            &test_config(max_requests),
            principals.clone(),
            refresh_tokens.clone(),
            clock.clone(),
        );

        TestState {
            state,
            principals,
            refresh_tokens,
            clock,
        }
    }
}
