//! Repository for the `roles` and `user_roles` tables.

use garage_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::role::Role;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides read operations for roles and writes for role assignments.
pub struct RoleRepo;

impl RoleRepo {
    /// Find all roles whose name is in `names`.
    pub async fn find_by_names(pool: &PgPool, names: &[String]) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = ANY($1) ORDER BY id ASC");
        sqlx::query_as::<_, Role>(&query)
            .bind(names)
            .fetch_all(pool)
            .await
    }

    /// List all roles ordered by ID ascending.
    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles ORDER BY id ASC");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }

    /// Role names assigned to a user, ordered by role ID.
    pub async fn names_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = $1
             ORDER BY r.id ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the user's role links with the roles named in `names`.
    ///
    /// Returns the number of links written; the caller compares it against
    /// `names.len()` to detect unknown role names.
    pub async fn replace_for_user(
        conn: &mut PgConnection,
        user_id: DbId,
        names: &[String],
    ) -> Result<u64, sqlx::Error> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = ANY($2)",
        )
        .bind(user_id)
        .bind(names)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
