//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login          -> login
/// POST /register       -> register
/// POST /refresh-token  -> refresh_token
/// POST /logout         -> logout (requires auth)
/// GET  /me             -> me (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}
