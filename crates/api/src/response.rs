//! Shared response envelope types for API handlers.
//!
//! Collection and administrative responses use a `{ "data": ... }` envelope.
//! The `/auth` endpoints return their payload unwrapped because clients read
//! the token fields at the top level.

use serde::Serialize;

/// `{ "data": T }` envelope used by the admin and roles endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
