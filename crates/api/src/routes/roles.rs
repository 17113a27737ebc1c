//! Route definitions for the `/roles` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// Routes mounted at `/roles`.
///
/// ```text
/// GET / -> list_roles (admin or manager)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(roles::list_roles))
}
