//! Domain primitives shared by the garage back-office crates.

pub mod error;
pub mod roles;
pub mod types;
pub mod validation;
