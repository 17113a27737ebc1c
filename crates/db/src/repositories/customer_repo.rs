//! Repository for the `customers` table.

use garage_core::types::DbId;
use sqlx::PgConnection;

use crate::models::customer::{CreateCustomer, Customer};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, first_name, last_name, address, created_at";

/// Provides write operations for customer profiles.
pub struct CustomerRepo;

impl CustomerRepo {
    /// Insert a profile for an existing user, returning the created row.
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: DbId,
        input: &CreateCustomer,
    ) -> Result<Customer, sqlx::Error> {
        let query = format!(
            "INSERT INTO customers (user_id, first_name, last_name, address)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(user_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.address)
            .fetch_one(conn)
            .await
    }
}
