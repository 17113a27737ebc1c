//! Storage ports used by the authentication core.
//!
//! Both traits are object safe so the API layer can hold them as
//! `Arc<dyn ...>` and swap the PostgreSQL backend for the in-memory one.

use async_trait::async_trait;
use garage_core::types::{DbId, Timestamp};

use crate::models::customer::{CreateCustomer, Customer};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::models::role::Role;
use crate::models::user::{CreateUser, User};

/// The field a unique constraint protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
    RefreshToken,
    Other,
}

/// Errors raised by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Unique constraint violated on {0:?}")]
    Duplicate(UniqueField),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a sqlx error, turning unique violations on `uq_` constraints
    /// into [`StoreError::Duplicate`].
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let field = match db_err.constraint() {
                    Some("uq_users_username") => UniqueField::Username,
                    Some("uq_users_email") => UniqueField::Email,
                    Some("uq_refresh_tokens_token_hash") => UniqueField::RefreshToken,
                    _ => UniqueField::Other,
                };
                return StoreError::Duplicate(field);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User identities, credentials, role assignments and customer profiles.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Confirm the backing storage is reachable.
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user_by_id(&self, id: DbId) -> StoreResult<Option<User>>;

    /// Case-sensitive lookup.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn username_exists(&self, username: &str) -> StoreResult<bool>;

    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    /// Return the roles whose names appear in `names`. Unknown names are
    /// silently absent from the result.
    async fn find_roles_by_names(&self, names: &[String]) -> StoreResult<Vec<Role>>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Insert a user, its role links and its customer profile as one unit.
    async fn create_customer(
        &self,
        user: &CreateUser,
        profile: &CreateCustomer,
    ) -> StoreResult<(User, Customer)>;

    /// Replace the user's role set. Returns `None` if the user does not exist.
    async fn set_user_roles(&self, user_id: DbId, roles: &[String]) -> StoreResult<Option<User>>;

    /// Set or clear the active flag. Returns `false` if the user does not exist.
    async fn set_user_active(&self, user_id: DbId, active: bool) -> StoreResult<bool>;

    async fn record_login(&self, user_id: DbId) -> StoreResult<()>;
}

/// Persisted refresh tokens, at most one per user.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Delete any token the user holds and insert `input` in its place.
    ///
    /// Implementations serialize calls for the same user so that two
    /// concurrent replacements always leave exactly one row behind. Fails with
    /// [`StoreError::NotFound`] if the user does not exist.
    async fn replace_for_user(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken>;

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, id: DbId) -> StoreResult<bool>;

    /// Returns the number of rows deleted (0 or 1).
    async fn delete_by_user(&self, user_id: DbId) -> StoreResult<u64>;

    /// Delete every token whose expiry is at or before `now`.
    async fn delete_expired(&self, now: Timestamp) -> StoreResult<u64>;
}
