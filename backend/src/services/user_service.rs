//! User business logic service.
//!
//! Handles registration, credential checks and the admin-side user
//! operations on top of a [`PrincipalStore`].

use crate::api::common::PaginationFilter;
use crate::auth::models::RegisterRequest;
use crate::auth::permissions::Role;
use crate::database::models::{CreateUser, User};
use crate::errors::{AuthError, ServiceError, ServiceResult, format_validation_errors};
use crate::repositories::{DuplicateUser, PrincipalStore};
use crate::utils::clock::Clock;
use bcrypt::{hash, verify};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub struct UserService {
    principals: Arc<dyn PrincipalStore>,
    clock: Arc<dyn Clock>,
    bcrypt_cost: u32,
}

impl UserService {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `principals` - User persistence collaborator
    /// * `clock` - Time source for created/seen timestamps
    /// * `bcrypt_cost` - Work factor used when hashing passwords
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        clock: Arc<dyn Clock>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            principals,
            clock,
            bcrypt_cost,
        }
    }

    /// Registers a new user with the default role.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures
    /// - Username or email already taken
    /// - Business rule violations
    pub async fn create_user(&self, request: RegisterRequest) -> ServiceResult<User> {
        if let Err(validation_errors) = request.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                &validation_errors,
            )));
        }

        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        Self::validate_business_rules(&username)?;

        if self.principals.get_user_by_username(&username).await?.is_some() {
            return Err(ServiceError::already_exists("User", &username));
        }
        if self.principals.get_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::already_exists("User", &email));
        }

        let password_hash = self.hash_password(&request.password)?;

        // Deactivated accounts still hold their username and email.
        let user = self
            .principals
            .create_user(CreateUser {
                username: username.clone(),
                email,
                password_hash,
                role: Role::User,
                created_at: self.clock.now(),
            })
            .await
            .map_err(|e| {
                if e.is::<DuplicateUser>() {
                    ServiceError::already_exists("User", &username)
                } else {
                    ServiceError::from(e)
                }
            })?;

        info!("Registered user {} (ID: {})", user.username, user.id);
        Ok(user)
    }

    /// Checks credentials. `identifier` may be a username or an email.
    ///
    /// Unknown users and wrong passwords both yield `InvalidCredentials`.
    pub async fn authenticate_user(
        &self,
        identifier: &str,
        password: &str,
    ) -> ServiceResult<User> {
        let identifier = identifier.trim();
        let user = if identifier.contains('@') {
            self.principals
                .get_user_by_email(&identifier.to_lowercase())
                .await?
        } else {
            self.principals.get_user_by_username(identifier).await?
        };

        let Some(user) = user else {
            warn!("Login attempt for unknown user: {}", identifier);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !Self::verify_password(password, &user.password_hash)? {
            warn!("Invalid password for user: {}", user.username);
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_enabled() {
            warn!("Inactive user attempted login: {}", user.username);
            return Err(AuthError::AccountInactive.into());
        }

        Ok(user)
    }

    /// Records a successful login.
    pub async fn touch_last_seen(&self, id: i64) -> ServiceResult<()> {
        self.principals.touch_last_seen(id, self.clock.now()).await?;
        Ok(())
    }

    /// Retrieves a user by ID with existence verification.
    ///
    /// # Errors
    /// Returns `ServiceError::NotFound` if user doesn't exist
    pub async fn get_user_required(&self, id: i64) -> ServiceResult<User> {
        self.principals
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id.to_string()))
    }

    /// A page of live users plus the total count.
    pub async fn list_users(
        &self,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<User>, u64)> {
        if let Err(validation_errors) = pagination.validate() {
            return Err(ServiceError::validation(format_validation_errors(
                &validation_errors,
            )));
        }

        let users = self.principals.list_users(pagination).await?;
        let total = self.principals.count_users().await?;
        Ok((users, total))
    }

    pub async fn count_users(&self) -> ServiceResult<u64> {
        Ok(self.principals.count_users().await?)
    }

    /// Logically deletes a user. Actors cannot delete themselves.
    pub async fn deactivate_user(&self, actor_id: i64, id: i64) -> ServiceResult<()> {
        if actor_id == id {
            return Err(ServiceError::invalid_operation(
                "Users cannot deactivate their own account",
            ));
        }

        let target = self.get_user_required(id).await?;
        if target.role == Role::SuperAdmin {
            return Err(ServiceError::permission_denied(
                "Super admin accounts cannot be deactivated",
            ));
        }

        if !self.principals.soft_delete_user(id, self.clock.now()).await? {
            return Err(ServiceError::not_found("User", id.to_string()));
        }

        info!("User {} deactivated by {}", id, actor_id);
        Ok(())
    }

    /// Function to hash a password before storing in database
    fn hash_password(&self, password: &str) -> ServiceResult<String> {
        hash(password, self.bcrypt_cost)
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
    }

    /// Function to verify a password against the stored hash
    fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
        verify(password, hash).map_err(|e| {
            ServiceError::internal_error(format!("Password verification failed: {}", e))
        })
    }

    /// Business validation rules.
    fn validate_business_rules(username: &str) -> ServiceResult<()> {
        // Usernames must start with a letter and contain no whitespace or '@'
        if !username.chars().next().is_some_and(|c| c.is_alphabetic()) {
            return Err(ServiceError::validation("Username must start with a letter"));
        }
        if username.chars().any(|c| c.is_whitespace() || c == '@') {
            return Err(ServiceError::validation(
                "Username must not contain whitespace or '@'",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repositories::memory::InMemoryPrincipalStore;
    use crate::repositories::user_repository::UserRepository;
    use crate::utils::clock::ManualClock;

    fn service() -> (UserService, Arc<InMemoryPrincipalStore>) {
        let store = Arc::new(InMemoryPrincipalStore::new());
        let clock = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
        (UserService::new(store.clone(), clock, 4), store)
    }

    fn register(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (service, _) = service();
        let user = service
            .create_user(register("alice", "Alice@Example.com"))
            .await
            .unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "correct horse");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let (service, _) = service();
        service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            service
                .create_user(register("alice", "other@example.com"))
                .await,
            Err(ServiceError::AlreadyExists { .. })
        ));
        assert!(matches!(
            service
                .create_user(register("alice2", "alice@example.com"))
                .await,
            Err(ServiceError::AlreadyExists { .. })
        ));
        assert!(matches!(
            service.create_user(register("bob", "not-an-email")).await,
            Err(ServiceError::Validation { .. })
        ));
        assert!(matches!(
            service.create_user(register("9lives", "cat@example.com")).await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_authenticate_by_username_or_email() {
        let (service, _) = service();
        let user = service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_name = service
            .authenticate_user("alice", "correct horse")
            .await
            .unwrap();
        assert_eq!(by_name.id, user.id);

        let by_email = service
            .authenticate_user("ALICE@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(matches!(
            service.authenticate_user("alice", "wrong").await,
            Err(ServiceError::Auth(AuthError::InvalidCredentials))
        ));
        assert!(matches!(
            service.authenticate_user("nobody", "correct horse").await,
            Err(ServiceError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let (service, store) = service();
        let user = service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();
        store.update(user.id, |u| u.is_active = false);

        assert!(matches!(
            service.authenticate_user("alice", "correct horse").await,
            Err(ServiceError::Auth(AuthError::AccountInactive))
        ));
    }

    #[tokio::test]
    async fn test_deactivate_rules() {
        let (service, store) = service();
        let admin = service
            .create_user(register("admin", "admin@example.com"))
            .await
            .unwrap();
        let user = service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            service.deactivate_user(admin.id, admin.id).await,
            Err(ServiceError::InvalidOperation { .. })
        ));

        service.deactivate_user(admin.id, user.id).await.unwrap();
        assert!(matches!(
            service.get_user_required(user.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert_eq!(service.count_users().await.unwrap(), 1);

        store.update(admin.id, |u| u.role = Role::SuperAdmin);
        let other = service
            .create_user(register("carol", "carol@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            service.deactivate_user(other.id, admin.id).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_reregistering_deactivated_account_conflicts() {
        let (service, _) = service();
        let admin = service
            .create_user(register("admin", "admin@example.com"))
            .await
            .unwrap();
        let alice = service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();
        service.deactivate_user(admin.id, alice.id).await.unwrap();

        assert!(matches!(
            service
                .create_user(register("alice", "new@example.com"))
                .await,
            Err(ServiceError::AlreadyExists { .. })
        ));
        assert!(matches!(
            service
                .create_user(register("alice2", "alice@example.com"))
                .await,
            Err(ServiceError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_reregistering_deactivated_account_conflicts_in_sqlite() {
        let clock = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
        let service = UserService::new(Arc::new(UserRepository::new(test_pool().await)), clock, 4);
        let admin = service
            .create_user(register("admin", "admin@example.com"))
            .await
            .unwrap();
        let alice = service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();
        service.deactivate_user(admin.id, alice.id).await.unwrap();

        let err = service
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists { .. }));
        let (status, _) = crate::api::common::service_error_to_http(err);
        assert_eq!(status, axum::http::StatusCode::CONFLICT);
    }
}
