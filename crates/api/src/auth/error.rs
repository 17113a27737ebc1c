//! Error type for the authentication core.

use garage_core::types::DbId;
use garage_db::store::StoreError;

/// Why a refresh attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No stored token matches the presented string.
    NotFound,
    /// The token existed but had expired; it has now been deleted.
    Expired,
    /// The owning user is gone or deactivated.
    UserUnavailable,
}

impl std::fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            RefreshFailure::NotFound => "Refresh token is not in database",
            RefreshFailure::Expired => "Refresh token was expired. Please make a new signin request",
            RefreshFailure::UserUnavailable => "Refresh token owner is no longer active",
        };
        f.write_str(msg)
    }
}

/// Errors raised by the authentication gateway and refresh-token service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown username or wrong password; the two are never distinguished.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error("{0}")]
    TokenRefresh(RefreshFailure),

    #[error("User with id {0} not found")]
    UserNotFound(DbId),

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email is already in use")]
    EmailTaken,

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;
