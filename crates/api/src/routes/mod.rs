pub mod admin;
pub mod auth;
pub mod health;
pub mod roles;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/register                                   register (public)
/// /auth/refresh-token                              refresh (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/me                                         caller identity (requires auth)
///
/// /admin/users                                     list (admin only)
/// /admin/users/{id}/roles                          replace roles (PUT)
/// /admin/users/{id}/active                         toggle active flag (PUT)
/// /admin/refresh-tokens/purge                      delete expired tokens (POST)
///
/// /roles                                           list (admin or manager)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/roles", roles::router())
}
