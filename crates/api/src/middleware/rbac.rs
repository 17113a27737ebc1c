//! Role gate.
//!
//! Handlers call these checks explicitly after extracting [`AuthUser`]. Role
//! membership is a plain set test on the token's role snapshot; there is no
//! hierarchy, so an ADMIN does not implicitly hold MANAGER.

use garage_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};

/// Requires `role`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(user: AuthUser) -> AppResult<Json<()>> {
///     require_role(&user, ROLE_ADMIN)?;
///     Ok(Json(()))
/// }
/// ```
pub fn require_role(user: &AuthUser, role: &str) -> AppResult<()> {
    if user.has_role(role) {
        return Ok(());
    }
    tracing::debug!(user_id = user.user_id, required = role, "Role check failed");
    Err(AppError::Core(CoreError::Forbidden(format!(
        "{role} role required"
    ))))
}

/// Requires at least one of `roles`. Rejects with 403 Forbidden otherwise.
pub fn require_any_role(user: &AuthUser, roles: &[&str]) -> AppResult<()> {
    if roles.iter().any(|role| user.has_role(role)) {
        return Ok(());
    }
    tracing::debug!(user_id = user.user_id, required = ?roles, "Role check failed");
    Err(AppError::Core(CoreError::Forbidden(format!(
        "One of {} roles required",
        roles.join(", ")
    ))))
}
