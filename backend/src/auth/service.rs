//! Core business logic for the authentication system.
//!
//! Orchestrates the user service and the token service: credentials are
//! checked, a token pair is minted, and the refresh token is persisted as the
//! principal's only live one.

use std::sync::Arc;

use crate::auth::models::*;
use crate::auth::token_service::TokenService;
use crate::errors::{ServiceError, ServiceResult, format_validation_errors};
use crate::services::user_service::UserService;
use crate::utils::jwt::Claims;
use tracing::{info, warn};
use validator::Validate;

const BEARER: &str = "Bearer";

/// Authentication service for handling login, token refresh and logout
pub struct AuthService {
    users: Arc<UserService>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<UserService>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Registers a user and signs them in.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<LoginResponse> {
        let user = self.users.create_user(request).await?;
        self.start_session(Principal::from(&user)).await
    }

    /// Authenticate user and generate JWT tokens
    pub async fn login(&self, login_request: LoginRequest) -> ServiceResult<LoginResponse> {
        if let Err(validation_errors) = login_request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                &validation_errors,
            )));
        }

        let user = self
            .users
            .authenticate_user(&login_request.identifier, &login_request.password)
            .await?;

        let response = self.start_session(Principal::from(&user)).await?;

        if let Err(e) = self.users.touch_last_seen(user.id).await {
            // Don't fail login for this
            warn!("Failed to update last seen for user {}: {}", user.id, e);
        }

        info!("User logged in: {} (ID: {})", user.username, user.id);
        Ok(response)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_token(
        &self,
        request: RefreshTokenRequest,
    ) -> ServiceResult<RefreshTokenResponse> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                &validation_errors,
            )));
        }

        let access = self
            .tokens
            .refresh_access_token(&request.refresh_token)
            .await?;

        Ok(RefreshTokenResponse {
            access_token: access.token,
            token_type: BEARER,
            expires_in: access.expires_in,
        })
    }

    /// Revoke the refresh token. Unknown tokens succeed silently.
    pub async fn logout(&self, request: LogoutRequest) -> ServiceResult<()> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                &validation_errors,
            )));
        }

        self.tokens.logout(&request.refresh_token).await?;
        Ok(())
    }

    /// Current user details for a verified access token
    pub async fn me(&self, claims: &Claims) -> ServiceResult<UserInfo> {
        let user = self.users.get_user_required(claims.user_id).await?;
        Ok(UserInfo::from(&Principal::from(&user)))
    }

    async fn start_session(&self, principal: Principal) -> ServiceResult<LoginResponse> {
        let pair = self.tokens.issue_token_pair(&principal)?;
        self.tokens
            .rotate_refresh_token(principal.id, &pair.refresh_token)
            .await?;

        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: BEARER,
            user: UserInfo::from(&principal),
            expires_in: pair.expires_in,
        })
    }
}
