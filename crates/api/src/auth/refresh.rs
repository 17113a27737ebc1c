//! Refresh-token lifecycle: issue, look up, expire and revoke.
//!
//! Refresh tokens are opaque random strings; only their SHA-256 hash is stored
//! server-side so a database leak does not compromise active sessions. Each
//! user holds at most one live token: issuing a new one replaces the old.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use garage_core::types::DbId;
use garage_db::models::refresh_token::{CreateRefreshToken, RefreshToken};
use garage_db::store::{CredentialStore, RefreshTokenStore, StoreError};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::error::{AuthError, AuthResult, RefreshFailure};

/// A freshly issued refresh token: the stored row plus the plaintext that is
/// handed to the client exactly once.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub record: RefreshToken,
}

/// Issues and validates refresh tokens on top of the storage ports.
#[derive(Clone)]
pub struct RefreshTokenService {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            credentials,
            tokens,
            ttl,
        }
    }

    /// Issue a new token for `user_id`, deleting any token the user already holds.
    pub async fn create(&self, user_id: DbId) -> AuthResult<IssuedRefreshToken> {
        if self.credentials.find_user_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound(user_id));
        }

        let (plaintext, token_hash) = generate_refresh_token();
        let input = CreateRefreshToken {
            user_id,
            token_hash,
            expires_at: Utc::now()
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let record = self
            .tokens
            .replace_for_user(&input)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => AuthError::UserNotFound(user_id),
                other => AuthError::Store(other),
            })?;

        Ok(IssuedRefreshToken {
            token: plaintext,
            record,
        })
    }

    /// Resolve a client-presented token string to its stored row.
    pub async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .find_by_token_hash(&hash_refresh_token(token))
            .await?)
    }

    /// Pass a live token through; delete an expired one and fail.
    ///
    /// After an `Expired` failure the row no longer exists.
    pub async fn verify_expiration(&self, token: RefreshToken) -> AuthResult<RefreshToken> {
        if token.is_expired(Utc::now()) {
            self.tokens.delete(token.id).await?;
            tracing::info!(user_id = token.user_id, "Expired refresh token removed");
            return Err(AuthError::TokenRefresh(RefreshFailure::Expired));
        }
        Ok(token)
    }

    /// Revoke the user's session. Deleting nothing is not an error.
    pub async fn delete_by_user(&self, user_id: DbId) -> AuthResult<u64> {
        Ok(self.tokens.delete_by_user(user_id).await?)
    }

    /// Delete every expired token in the store.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let purged = self.tokens.delete_expired(Utc::now()).await?;
        tracing::info!(purged, "Purged expired refresh tokens");
        Ok(purged)
    }
}

/// Generate a cryptographically random refresh token.
///
/// Returns a tuple of `(plaintext_token, sha256_hex_hash)`. The plaintext is
/// sent to the client; only the hash should be persisted server-side.
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = Uuid::new_v4().to_string();
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a refresh token.
///
/// Use this to compare an incoming refresh token against the stored hash.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
