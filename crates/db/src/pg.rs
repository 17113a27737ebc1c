//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use garage_core::types::{DbId, Timestamp};

use crate::models::customer::{CreateCustomer, Customer};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::models::role::Role;
use crate::models::user::{CreateUser, User};
use crate::repositories::{CustomerRepo, RefreshTokenRepo, RoleRepo, UserRepo};
use crate::store::{CredentialStore, RefreshTokenStore, StoreError, StoreResult};
use crate::DbPool;

/// Both stores backed by one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Name the first entry of `requested` that has no row in `roles`.
    async fn unknown_role(&self, requested: &[String]) -> StoreError {
        let found = match RoleRepo::find_by_names(&self.pool, requested).await {
            Ok(found) => found,
            Err(e) => return StoreError::Database(e),
        };
        let missing = requested
            .iter()
            .find(|name| !found.iter().any(|r| &r.name == *name))
            .cloned()
            .unwrap_or_else(|| requested.join(","));
        StoreError::UnknownRole(missing)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_username(&self.pool, username).await?)
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(UserRepo::exists_by_username(&self.pool, username).await?)
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(UserRepo::exists_by_email(&self.pool, email).await?)
    }

    async fn find_roles_by_names(&self, names: &[String]) -> StoreResult<Vec<Role>> {
        Ok(RoleRepo::find_by_names(&self.pool, names).await?)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(RoleRepo::list(&self.pool).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(UserRepo::list(&self.pool).await?)
    }

    async fn create_customer(
        &self,
        user: &CreateUser,
        profile: &CreateCustomer,
    ) -> StoreResult<(User, Customer)> {
        let mut tx = self.pool.begin().await?;

        let mut created = UserRepo::insert(&mut tx, user)
            .await
            .map_err(StoreError::from_sqlx)?;

        let roles = distinct(&user.roles);
        let linked = RoleRepo::replace_for_user(&mut tx, created.id, &roles).await?;
        if linked != roles.len() as u64 {
            // Dropping `tx` rolls the insert back.
            return Err(self.unknown_role(&roles).await);
        }

        let customer = CustomerRepo::insert(&mut tx, created.id, profile)
            .await
            .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;

        created.roles = RoleRepo::names_for_user(&self.pool, created.id).await?;
        tracing::debug!(user_id = created.id, customer_id = customer.id, "Customer registered");
        Ok((created, customer))
    }

    async fn set_user_roles(&self, user_id: DbId, roles: &[String]) -> StoreResult<Option<User>> {
        let mut tx = self.pool.begin().await?;

        if !UserRepo::lock(&mut tx, user_id).await? {
            return Ok(None);
        }

        let roles = distinct(roles);
        let linked = RoleRepo::replace_for_user(&mut tx, user_id, &roles).await?;
        if linked != roles.len() as u64 {
            return Err(self.unknown_role(&roles).await);
        }

        tx.commit().await?;
        Ok(UserRepo::find_by_id(&self.pool, user_id).await?)
    }

    async fn set_user_active(&self, user_id: DbId, active: bool) -> StoreResult<bool> {
        Ok(UserRepo::set_active(&self.pool, user_id, active).await?)
    }

    async fn record_login(&self, user_id: DbId) -> StoreResult<()> {
        Ok(UserRepo::record_successful_login(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn replace_for_user(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken> {
        let mut tx = self.pool.begin().await?;

        // The row lock on the owning user serializes concurrent replacements
        // for the same user; `uq_refresh_tokens_user_id` backs it up.
        if !UserRepo::lock(&mut tx, input.user_id).await? {
            return Err(StoreError::NotFound {
                entity: "User",
                id: input.user_id,
            });
        }

        let replaced = RefreshTokenRepo::delete_by_user(&mut tx, input.user_id).await?;
        let token = RefreshTokenRepo::insert(&mut tx, input)
            .await
            .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;

        tracing::debug!(user_id = input.user_id, replaced, "Refresh token replaced");
        Ok(token)
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(RefreshTokenRepo::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        Ok(RefreshTokenRepo::delete(&self.pool, id).await?)
    }

    async fn delete_by_user(&self, user_id: DbId) -> StoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Ok(RefreshTokenRepo::delete_by_user(&mut conn, user_id).await?)
    }

    async fn delete_expired(&self, now: Timestamp) -> StoreResult<u64> {
        Ok(RefreshTokenRepo::delete_expired(&self.pool, now).await?)
    }
}

/// Drop repeated names, keeping first occurrences in order.
fn distinct(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}
