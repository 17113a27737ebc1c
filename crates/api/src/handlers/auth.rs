//! Handlers for the `/auth` resource (login, refresh, register, logout, me).

use axum::extract::{Query, State};
use axum::Json;
use garage_core::error::CoreError;
use garage_core::roles::ROLE_ADMIN;
use garage_core::types::DbId;
use garage_core::validation::validate_input;
use garage_db::models::customer::Customer;
use garage_db::models::user::User;
use serde::{Deserialize, Serialize};

use crate::auth::service::Registration;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Token type reported alongside every access token.
const TOKEN_TYPE: &str = "Bearer";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh-token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Query string for `POST /auth/logout`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutParams {
    /// Whose session to revoke. Defaults to the caller.
    pub user_id: Option<DbId>,
}

/// Successful login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user_id: DbId,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// Successful refresh response. `refresh_token` echoes the presented token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Number of refresh tokens revoked (0 or 1).
    pub deleted: u64,
}

/// The customer profile created by registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfileResponse {
    pub id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub roles: Vec<String>,
}

impl CustomerProfileResponse {
    fn new(user: User, customer: Customer) -> Self {
        Self {
            id: customer.id,
            user_id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            first_name: customer.first_name,
            last_name: customer.last_name,
            address: customer.address,
            roles: user.roles,
        }
    }
}

/// The caller as seen by the authorization filter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: DbId,
    pub username: String,
    pub roles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns access and refresh tokens;
/// any refresh token the user held before is revoked.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = state.auth.login(&input.username, &input.password).await?;

    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: outcome.expires_in,
        user_id: outcome.user.id,
        username: outcome.user.username,
        email: outcome.user.email,
        roles: outcome.user.roles,
    }))
}

/// POST /api/v1/auth/refresh-token
///
/// Exchange a stored refresh token for a new access token. Any failure is
/// reported as 403 `TOKEN_REFRESH_ERROR`.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let outcome = state.auth.refresh(&input.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: outcome.expires_in,
    }))
}

/// POST /api/v1/auth/register
///
/// Create a user account with a customer profile.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<Registration>,
) -> AppResult<Json<CustomerProfileResponse>> {
    validate_input(&input)?;

    let (user, customer) = state.auth.register(&input).await?;
    Ok(Json(CustomerProfileResponse::new(user, customer)))
}

/// POST /api/v1/auth/logout?userId=N
///
/// Revoke a refresh token. Callers may revoke their own session; revoking
/// another user's session requires ADMIN. Already-issued access tokens stay
/// valid until they expire.
pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(params): Query<LogoutParams>,
) -> AppResult<Json<LogoutResponse>> {
    let target = params.user_id.unwrap_or(caller.user_id);

    if target != caller.user_id && !caller.has_role(ROLE_ADMIN) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot log out another user".into(),
        )));
    }

    let deleted = state.auth.logout(target).await?;
    Ok(Json(LogoutResponse { deleted }))
}

/// GET /api/v1/auth/me
pub async fn me(caller: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: caller.user_id,
        username: caller.username,
        roles: caller.roles,
    })
}
