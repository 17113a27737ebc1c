//! Handlers for the `/roles` resource.

use axum::extract::State;
use axum::Json;
use garage_core::roles::{ROLE_ADMIN, ROLE_MANAGER};
use garage_db::models::role::Role;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_any_role;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/roles
///
/// Open to ADMIN and MANAGER.
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Role>>>> {
    require_any_role(&user, &[ROLE_ADMIN, ROLE_MANAGER])?;

    let roles = state.credentials.list_roles().await?;
    Ok(Json(DataResponse { data: roles }))
}
