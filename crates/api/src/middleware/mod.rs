//! Request authentication and authorization.
//!
//! - [`auth`] -- bearer-token filter, whitelist enforcement and the [`auth::AuthUser`] extractor.
//! - [`rbac`] -- role gate checks called from handlers.

pub mod auth;
pub mod rbac;
