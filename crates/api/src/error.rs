use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use garage_core::error::CoreError;
use garage_db::store::StoreError;
use serde_json::json;

use crate::auth::error::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, [`AuthError`] for the authentication
/// core and [`StoreError`] for persistence failures. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `garage_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error from login, refresh, registration or logout.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- Authentication core ---
            AppError::Auth(auth) => classify_auth_error(auth),

            // --- Storage errors ---
            AppError::Store(err) => classify_store_error(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
    }
}

/// Map authentication failures to status codes.
///
/// Credential failures are 401, refresh failures are 403 so
/// the client knows to sign in again, and uniqueness problems at registration
/// are 400 with a per-field code.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            err.to_string(),
        ),
        AuthError::AccountDisabled => (StatusCode::FORBIDDEN, "ACCOUNT_DISABLED", err.to_string()),
        AuthError::TokenRefresh(failure) => {
            tracing::info!(reason = ?failure, "Refresh token rejected");
            (
                StatusCode::FORBIDDEN,
                "TOKEN_REFRESH_ERROR",
                err.to_string(),
            )
        }
        AuthError::UserNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        AuthError::UsernameTaken => (StatusCode::BAD_REQUEST, "USERNAME_TAKEN", err.to_string()),
        AuthError::EmailTaken => (StatusCode::BAD_REQUEST, "EMAIL_TAKEN", err.to_string()),
        AuthError::RoleNotFound(_) => (StatusCode::BAD_REQUEST, "ROLE_NOT_FOUND", err.to_string()),
        AuthError::Internal(msg) => internal(msg),
        AuthError::Store(store) => classify_store_error(store),
    }
}

/// Classify a store error into an HTTP status, error code, and message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        StoreError::Duplicate(field) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value for {field:?}"),
        ),
        StoreError::UnknownRole(name) => (
            StatusCode::BAD_REQUEST,
            "ROLE_NOT_FOUND",
            format!("Role not found: {name}"),
        ),
        StoreError::Database(db) => classify_sqlx_error(db),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
