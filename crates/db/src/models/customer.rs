//! Customer profile model and DTOs.

use garage_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A customer profile row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: DbId,
    pub user_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for the profile half of a registration. `user_id` is filled in by the
/// store once the user row exists.
#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
}
