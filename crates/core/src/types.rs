/// Primary key of users, roles, customer profiles and refresh tokens
/// (PostgreSQL `BIGSERIAL`).
pub type DbId = i64;

/// Creation, last-login and expiry instants, always in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
