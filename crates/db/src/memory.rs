//! In-process implementation of the store traits.
//!
//! Mirrors the PostgreSQL schema closely enough for the authentication core:
//! seeded roles, unique usernames/emails, one refresh token per user and a
//! foreign-key check on the token owner. Every mutation happens under a
//! single write lock, which also serializes refresh-token replacement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use garage_core::roles::SEEDED_ROLES;
use garage_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use crate::models::customer::{CreateCustomer, Customer};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::models::role::Role;
use crate::models::user::{CreateUser, User};
use crate::store::{CredentialStore, RefreshTokenStore, StoreError, StoreResult, UniqueField};

#[derive(Default)]
struct Tables {
    roles: Vec<Role>,
    users: HashMap<DbId, User>,
    customers: HashMap<DbId, Customer>,
    /// Keyed by owning user id, which enforces one token per user.
    refresh_tokens: HashMap<DbId, RefreshToken>,
    next_user_id: DbId,
    next_customer_id: DbId,
    next_token_id: DbId,
}

impl Tables {
    fn known_roles(&self, names: &[String]) -> StoreResult<Vec<String>> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            if !self.roles.iter().any(|r| &r.name == name) {
                return Err(StoreError::UnknownRole(name.clone()));
            }
            if !resolved.contains(name) {
                resolved.push(name.clone());
            }
        }
        // Match the PostgreSQL ordering (by role id).
        resolved.sort_by_key(|name| {
            self.roles
                .iter()
                .position(|r| &r.name == name)
                .unwrap_or(usize::MAX)
        });
        Ok(resolved)
    }
}

/// Thread-safe store holding all tables in memory.
///
/// Cheap to share behind an `Arc`; a fresh instance starts with the five
/// seeded roles and no users.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let now = Utc::now();
        let roles = SEEDED_ROLES
            .iter()
            .zip(1..)
            .map(|((name, description), id)| Role {
                id,
                name: (*name).to_string(),
                description: Some((*description).to_string()),
                created_at: now,
                updated_at: now,
            })
            .collect();

        Self {
            tables: RwLock::new(Tables {
                roles,
                next_user_id: 1,
                next_customer_id: 1,
                next_token_id: 1,
                ..Tables::default()
            }),
        }
    }

    /// Number of refresh tokens currently stored for `user_id` (0 or 1).
    pub async fn refresh_token_count(&self, user_id: DbId) -> usize {
        usize::from(self.tables.read().await.refresh_tokens.contains_key(&user_id))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_id(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(|u| u.email == email))
    }

    async fn find_roles_by_names(&self, names: &[String]) -> StoreResult<Vec<Role>> {
        Ok(self
            .tables
            .read()
            .await
            .roles
            .iter()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.tables.read().await.roles.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn create_customer(
        &self,
        user: &CreateUser,
        profile: &CreateCustomer,
    ) -> StoreResult<(User, Customer)> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        let roles = tables.known_roles(&user.roles)?;

        let now = Utc::now();
        let user_id = tables.next_user_id;
        tables.next_user_id += 1;
        let created = User {
            id: user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            phone: user.phone.clone(),
            is_active: true,
            created_at: now,
            last_login_at: None,
            roles,
        };

        let customer_id = tables.next_customer_id;
        tables.next_customer_id += 1;
        let customer = Customer {
            id: customer_id,
            user_id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            address: profile.address.clone(),
            created_at: now,
        };

        tables.users.insert(user_id, created.clone());
        tables.customers.insert(customer_id, customer.clone());
        Ok((created, customer))
    }

    async fn set_user_roles(&self, user_id: DbId, roles: &[String]) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let resolved = tables.known_roles(roles)?;
        Ok(tables.users.get_mut(&user_id).map(|user| {
            user.roles = resolved;
            user.clone()
        }))
    }

    async fn set_user_active(&self, user_id: DbId, active: bool) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&user_id)
            .map(|user| user.is_active = active)
            .is_some())
    }

    async fn record_login(&self, user_id: DbId) -> StoreResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&user_id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn replace_for_user(&self, input: &CreateRefreshToken) -> StoreResult<RefreshToken> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&input.user_id) {
            return Err(StoreError::NotFound {
                entity: "User",
                id: input.user_id,
            });
        }
        if tables
            .refresh_tokens
            .values()
            .any(|t| t.user_id != input.user_id && t.token_hash == input.token_hash)
        {
            return Err(StoreError::Duplicate(UniqueField::RefreshToken));
        }

        let id = tables.next_token_id;
        tables.next_token_id += 1;
        let token = RefreshToken {
            id,
            user_id: input.user_id,
            token_hash: input.token_hash.clone(),
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        tables.refresh_tokens.insert(input.user_id, token.clone());
        Ok(token)
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self
            .tables
            .read()
            .await
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owner = tables
            .refresh_tokens
            .values()
            .find(|t| t.id == id)
            .map(|t| t.user_id);
        Ok(owner
            .and_then(|user_id| tables.refresh_tokens.remove(&user_id))
            .is_some())
    }

    async fn delete_by_user(&self, user_id: DbId) -> StoreResult<u64> {
        let removed = self.tables.write().await.refresh_tokens.remove(&user_id);
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_expired(&self, now: Timestamp) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn signup(username: &str, roles: &[&str]) -> (CreateUser, CreateCustomer) {
        (
            CreateUser {
                username: username.to_string(),
                email: format!("{username}@garage.test"),
                password_hash: "hash".to_string(),
                phone: None,
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
            CreateCustomer {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                address: None,
            },
        )
    }

    #[tokio::test]
    async fn seeds_roles() {
        let store = MemoryStore::new();
        let names: Vec<String> = store
            .list_roles()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["ADMIN", "MANAGER", "STAFF", "RECEPTIONIST", "CUSTOMER"]);
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_reported_separately() {
        let store = MemoryStore::new();
        let (user, profile) = signup("bob", &["CUSTOMER"]);
        store.create_customer(&user, &profile).await.unwrap();

        let err = store.create_customer(&user, &profile).await.unwrap_err();
        assert_matches!(err, StoreError::Duplicate(UniqueField::Username));

        let mut other = user.clone();
        other.username = "bobby".into();
        let err = store.create_customer(&other, &profile).await.unwrap_err();
        assert_matches!(err, StoreError::Duplicate(UniqueField::Email));
    }

    #[tokio::test]
    async fn unknown_role_rejects_registration() {
        let store = MemoryStore::new();
        let (user, profile) = signup("carol", &["WIZARD"]);
        let err = store.create_customer(&user, &profile).await.unwrap_err();
        assert_matches!(err, StoreError::UnknownRole(name) if name == "WIZARD");
        assert!(!store.username_exists("carol").await.unwrap());
    }

    #[tokio::test]
    async fn replacing_a_token_keeps_one_row_per_user() {
        let store = MemoryStore::new();
        let (user, profile) = signup("dave", &["STAFF"]);
        let (user, _) = store.create_customer(&user, &profile).await.unwrap();
        let expires_at = Utc::now() + Duration::hours(1);

        for digest in ["first", "second"] {
            store
                .replace_for_user(&CreateRefreshToken {
                    user_id: user.id,
                    token_hash: digest.to_string(),
                    expires_at,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.refresh_token_count(user.id).await, 1);
        assert!(store.find_by_token_hash("first").await.unwrap().is_none());
        assert!(store.find_by_token_hash("second").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn token_for_missing_user_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .replace_for_user(&CreateRefreshToken {
                user_id: 99,
                token_hash: "orphan".into(),
                expires_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::NotFound { entity: "User", id: 99 });
    }

    #[tokio::test]
    async fn delete_expired_keeps_live_tokens() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (name, offset) in [("old", -60), ("fresh", 60)] {
            let (user, profile) = signup(name, &["CUSTOMER"]);
            let (user, _) = store.create_customer(&user, &profile).await.unwrap();
            store
                .replace_for_user(&CreateRefreshToken {
                    user_id: user.id,
                    token_hash: name.to_string(),
                    expires_at: now + Duration::seconds(offset),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert!(store.find_by_token_hash("old").await.unwrap().is_none());
        assert!(store.find_by_token_hash("fresh").await.unwrap().is_some());
    }
}
