//! Repository structs with raw SQL against PostgreSQL.
//!
//! Each repository is a zero-sized struct with associated functions that take
//! a pool or connection. [`crate::pg::PgStore`] composes them into the store
//! traits.

pub mod customer_repo;
pub mod refresh_token_repo;
pub mod role_repo;
pub mod user_repo;

pub use customer_repo::CustomerRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use role_repo::RoleRepo;
pub use user_repo::UserRepo;
