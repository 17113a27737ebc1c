//! Bearer-token authentication.
//!
//! Two middleware functions cooperate:
//!
//! 1. [`authenticate`] reads `Authorization: Bearer <token>`, validates it with
//!    the access-token codec and stores an [`AuthContext`] in the request
//!    extensions. It never rejects a request.
//! 2. [`require_authentication`] lets whitelisted paths through and rejects
//!    every other request whose context is still anonymous with 401.
//!
//! Handlers obtain the caller through the [`AuthUser`] extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use garage_core::error::CoreError;
use garage_core::types::DbId;

use crate::auth::jwt::Claims;
use crate::error::AppError;
use crate::state::AppState;

/// The caller identity reconstructed from a valid access token.
///
/// Roles are the snapshot embedded at issuance; changes made since then are
/// not visible until the client refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: DbId,
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.sub,
            roles: claims.roles,
        }
    }
}

/// Per-request authentication state, always present after [`authenticate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    #[default]
    Anonymous,
    Authenticated(AuthUser),
}

impl AuthContext {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            AuthContext::Authenticated(user) => Some(user),
            AuthContext::Anonymous => None,
        }
    }
}

/// Extract the token from a `Bearer` authorization header.
///
/// Any other scheme, a missing header or an empty token yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Populate [`AuthContext`] from the bearer token, if any.
///
/// Validation failures leave the request anonymous; the failure kind is only
/// logged.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let context = match bearer_token(req.headers()) {
        None => AuthContext::Anonymous,
        Some(token) => match state.codec.decode(token) {
            Ok(claims) => AuthContext::Authenticated(claims.into()),
            Err(reason) => {
                tracing::debug!(
                    path = %req.uri().path(),
                    %reason,
                    "Cannot set user authentication"
                );
                AuthContext::Anonymous
            }
        },
    };

    req.extensions_mut().insert(context);
    next.run(req).await
}

/// Reject anonymous requests to any path outside the public whitelist.
pub async fn require_authentication(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if state.config.public_paths.is_public(path) {
        return next.run(req).await;
    }

    let authenticated = req
        .extensions()
        .get::<AuthContext>()
        .is_some_and(|ctx| ctx.user().is_some());

    if !authenticated {
        tracing::debug!(path, "Unauthenticated request to protected path");
        return unauthorized().into_response();
    }

    next.run(req).await
}

fn unauthorized() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Full authentication is required to access this resource".into(),
    ))
}

/// Authenticated caller extracted from the request's [`AuthContext`].
///
/// Use this as an extractor parameter in any handler that requires authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, roles = ?user.roles, "handling request");
///     Ok(Json(()))
/// }
/// ```
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(AuthContext::user)
            .cloned()
            .ok_or_else(unauthorized)
    }
}
