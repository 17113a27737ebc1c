//! Authentication core.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- Access-token codec (HS256 JWT encode/decode).
//! - [`refresh`] -- Refresh-token issue, lookup, expiry and revocation.
//! - [`service`] -- The gateway tying them together (login, refresh, register, logout).
//! - [`error`] -- Error type shared by the above.

pub mod error;
pub mod jwt;
pub mod password;
pub mod refresh;
pub mod service;
