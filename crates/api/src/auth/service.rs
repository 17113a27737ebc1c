//! Authentication gateway: login, refresh, registration and logout.

use std::sync::Arc;

use chrono::Utc;
use garage_core::roles::DEFAULT_ROLE;
use garage_core::types::DbId;
use garage_db::models::customer::{CreateCustomer, Customer};
use garage_db::models::user::{CreateUser, User};
use garage_db::store::{CredentialStore, StoreError, UniqueField};
use serde::Deserialize;
use tokio::sync::OnceCell;
use validator::Validate;

use crate::auth::error::{AuthError, AuthResult, RefreshFailure};
use crate::auth::jwt::AccessTokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::refresh::RefreshTokenService;

/// Signup fields for a new customer account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 5, max = 128, message = "must be between 5 and 128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub last_name: String,
    pub address: Option<String>,
    /// Requested role names; defaults to the baseline customer role.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: User,
}

/// Result of a successful refresh. `refresh_token` is the presented token,
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Orchestrates the credential store, password hasher, access-token codec
/// and refresh-token service.
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    refresh_tokens: RefreshTokenService,
    codec: Arc<AccessTokenCodec>,
    hasher: PasswordHasher,
    /// Hash checked against when the username is unknown, so both failure
    /// paths pay the same verification cost. Built with `hasher`'s params.
    decoy_hash: Arc<OnceCell<String>>,
}

/// Password behind the decoy hash. Never assigned to an account.
const DECOY_PASSWORD: &str = "garage-login-decoy";

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: RefreshTokenService,
        codec: Arc<AccessTokenCodec>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            credentials,
            refresh_tokens,
            codec,
            hasher,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenService {
        &self.refresh_tokens
    }

    /// Verify credentials and open a new session, replacing any previous one.
    ///
    /// Access tokens already held by another client stay valid until they
    /// expire; only the refresh token is revoked.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<LoginOutcome> {
        let Some(user) = self.credentials.find_user_by_username(username).await? else {
            let decoy = self
                .decoy_hash
                .get_or_try_init(|| self.hash_password(DECOY_PASSWORD.to_string()))
                .await?;
            self.verify_password(password.to_string(), decoy.clone())
                .await?;
            tracing::debug!(username, "Login attempt for unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?
        {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::warn!(user_id = user.id, "Login refused for deactivated account");
            return Err(AuthError::AccountDisabled);
        }

        self.credentials.record_login(user.id).await?;

        let access_token = self.issue_access_token(&user)?;
        let refresh = self.refresh_tokens.create(user.id).await?;

        tracing::info!(user_id = user.id, roles = ?user.roles, "User logged in");

        Ok(LoginOutcome {
            access_token,
            refresh_token: refresh.token,
            expires_in: self.codec.ttl().num_seconds(),
            user,
        })
    }

    /// Mint a new access token from a stored refresh token.
    ///
    /// Roles are re-read from the credential store, so role changes made since
    /// login take effect here. The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshOutcome> {
        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::TokenRefresh(RefreshFailure::NotFound))?;

        let stored = self.refresh_tokens.verify_expiration(stored).await?;

        let user = self
            .credentials
            .find_user_by_id(stored.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::TokenRefresh(RefreshFailure::UserUnavailable))?;

        let access_token = self.issue_access_token(&user)?;
        tracing::debug!(user_id = user.id, "Access token refreshed");

        Ok(RefreshOutcome {
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: self.codec.ttl().num_seconds(),
        })
    }

    /// Create a user and its customer profile. Input must already be validated.
    pub async fn register(&self, registration: &Registration) -> AuthResult<(User, Customer)> {
        if self
            .credentials
            .username_exists(&registration.username)
            .await?
        {
            return Err(AuthError::UsernameTaken);
        }
        if self.credentials.email_exists(&registration.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let roles = self.resolve_roles(&registration.roles).await?;
        let password_hash = self.hash_password(registration.password.clone()).await?;

        let user = CreateUser {
            username: registration.username.clone(),
            email: registration.email.clone(),
            password_hash,
            phone: registration.phone.clone(),
            roles,
        };
        let profile = CreateCustomer {
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            address: registration.address.clone(),
        };

        let (user, customer) = self
            .credentials
            .create_customer(&user, &profile)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(UniqueField::Username) => AuthError::UsernameTaken,
                StoreError::Duplicate(UniqueField::Email) => AuthError::EmailTaken,
                StoreError::UnknownRole(name) => AuthError::RoleNotFound(name),
                other => AuthError::Store(other),
            })?;

        tracing::info!(user_id = user.id, customer_id = customer.id, "User registered");
        Ok((user, customer))
    }

    /// Revoke the user's refresh token. Returns how many were deleted.
    pub async fn logout(&self, user_id: DbId) -> AuthResult<u64> {
        let deleted = self.refresh_tokens.delete_by_user(user_id).await?;
        tracing::info!(user_id, deleted, "User logged out");
        Ok(deleted)
    }

    fn issue_access_token(&self, user: &User) -> AuthResult<String> {
        self.codec
            .encode(&user.username, user.id, &user.roles, Utc::now())
            .map_err(|e| AuthError::Internal(format!("Token generation error: {e}")))
    }

    /// Map requested role names onto stored roles, defaulting to the baseline role.
    async fn resolve_roles(&self, requested: &[String]) -> AuthResult<Vec<String>> {
        if requested.is_empty() {
            return Ok(vec![DEFAULT_ROLE.to_string()]);
        }

        let found = self.credentials.find_roles_by_names(requested).await?;
        if let Some(missing) = requested
            .iter()
            .find(|name| !found.iter().any(|r| &r.name == *name))
        {
            return Err(AuthError::RoleNotFound(missing.clone()));
        }
        Ok(found.into_iter().map(|r| r.name).collect())
    }

    async fn verify_password(&self, password: String, hash: String) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("Password verification error: {e}")))
    }

    async fn hash_password(&self, password: String) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("Password hashing error: {e}")))
    }
}
