//! Route definitions for the `/admin` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the ADMIN role (checked in the handlers).
///
/// ```text
/// GET  /users                 -> list_users
/// PUT  /users/{id}/roles      -> update_user_roles
/// PUT  /users/{id}/active     -> set_user_active
/// POST /refresh-tokens/purge  -> purge_refresh_tokens
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/roles", put(admin::update_user_roles))
        .route("/users/{id}/active", put(admin::set_user_active))
        .route("/refresh-tokens/purge", post(admin::purge_refresh_tokens))
}
