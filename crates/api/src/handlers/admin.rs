//! Handlers for the `/admin` resource (user management, token maintenance).
//!
//! All handlers require the ADMIN role.

use axum::extract::{Path, State};
use axum::Json;
use garage_core::error::CoreError;
use garage_core::roles::ROLE_ADMIN;
use garage_core::types::DbId;
use garage_db::models::user::UserResponse;
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_role;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /admin/users/{id}/roles`.
#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    pub roles: Vec<String>,
}

/// Request body for `PUT /admin/users/{id}/active`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    admin: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    require_role(&admin, ROLE_ADMIN)?;

    let users = state.credentials.list_users().await?;
    Ok(Json(DataResponse {
        data: users.iter().map(UserResponse::from).collect(),
    }))
}

/// PUT /api/v1/admin/users/{id}/roles
///
/// Replace the user's role set. Tokens already issued keep their old role
/// snapshot; the next refresh picks up the change.
pub async fn update_user_roles(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRolesRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    require_role(&admin, ROLE_ADMIN)?;

    if input.roles.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "roles: must contain at least one role".into(),
        )));
    }

    let user = state
        .credentials
        .set_user_roles(id, &input.roles)
        .await?
        .ok_or(AppError::Auth(AuthError::UserNotFound(id)))?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id = id,
        roles = ?user.roles,
        "User roles updated"
    );

    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// PUT /api/v1/admin/users/{id}/active
///
/// Deactivating a user also revokes their refresh token so the session
/// cannot be extended.
pub async fn set_user_active(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<SetActiveRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    require_role(&admin, ROLE_ADMIN)?;

    if !state.credentials.set_user_active(id, input.is_active).await? {
        return Err(AppError::Auth(AuthError::UserNotFound(id)));
    }

    if !input.is_active {
        state.auth.logout(id).await?;
    }

    let user = state
        .credentials
        .find_user_by_id(id)
        .await?
        .ok_or(AppError::Auth(AuthError::UserNotFound(id)))?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id = id,
        is_active = input.is_active,
        "User active flag changed"
    );

    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// POST /api/v1/admin/refresh-tokens/purge
///
/// Delete every expired refresh token.
pub async fn purge_refresh_tokens(
    State(state): State<AppState>,
    admin: AuthUser,
) -> AppResult<Json<DataResponse<PurgeResponse>>> {
    require_role(&admin, ROLE_ADMIN)?;

    let purged = state.auth.refresh_tokens().purge_expired().await?;
    Ok(Json(DataResponse {
        data: PurgeResponse { purged },
    }))
}
