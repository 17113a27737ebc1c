//! HTTP-level integration tests for the auth, admin and roles endpoints.
//!
//! Tests cover login, token refresh, registration, logout, the request
//! authorization filter, whitelist enforcement and role gating.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, build_test_app, get, get_auth, post_json, post_json_auth, put_json_auth};
use garage_api::auth::refresh::hash_refresh_token;
use garage_db::models::refresh_token::CreateRefreshToken;
use garage_db::store::RefreshTokenStore;
use serde_json::json;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_success_returns_tokens_and_user_summary() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF"]).await;

    let json = app.login("alice", "pw123").await;

    assert!(json["accessToken"].is_string());
    assert!(json["refreshToken"].is_string());
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 900);
    assert_eq!(json["userId"], user.id);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["email"], "alice@garage.test");
    assert_eq!(json["roles"], json!(["STAFF"]));
}

#[tokio::test]
async fn login_wrong_password_and_unknown_user_are_indistinguishable() {
    let app = build_test_app();
    app.create_user("alice", "pw123", &["STAFF"]).await;

    let wrong = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "nope" }),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong = body_json(wrong).await;

    let ghost = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        json!({ "username": "ghost", "password": "nope" }),
    )
    .await;
    assert_eq!(ghost.status(), StatusCode::UNAUTHORIZED);
    let ghost = body_json(ghost).await;

    assert_eq!(wrong, ghost);
    assert_eq!(wrong["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_deactivated_account_with_correct_password_is_403() {
    let app = build_test_app();
    let user = app.create_user("carol", "pw123", &["STAFF"]).await;
    app.state.credentials.set_user_active(user.id, false).await.unwrap();

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        json!({ "username": "carol", "password": "pw123" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "ACCOUNT_DISABLED");

    // A wrong password on the same account still looks like any other failure.
    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/login",
        json!({ "username": "carol", "password": "wrong" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_revokes_previous_refresh_token() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF"]).await;

    let first = app.login("alice", "pw123").await;
    let second = app.login("alice", "pw123").await;
    assert_eq!(app.store.refresh_token_count(user.id).await, 1);

    let stale = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh-token",
        json!({ "refreshToken": first["refreshToken"] }),
    )
    .await;
    assert_eq!(stale.status(), StatusCode::FORBIDDEN);

    let live = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh-token",
        json!({ "refreshToken": second["refreshToken"] }),
    )
    .await;
    assert_eq!(live.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_returns_new_access_token_and_same_refresh_token() {
    let app = build_test_app();
    app.create_user("alice", "pw123", &["STAFF"]).await;
    let login = app.login("alice", "pw123").await;

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh-token",
        json!({ "refreshToken": login["refreshToken"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["refreshToken"], login["refreshToken"]);
    assert_eq!(json["tokenType"], "Bearer");

    let access = json["accessToken"].as_str().unwrap();
    let claims = app.state.codec.decode(access).unwrap();
    assert_eq!(claims.sub, "alice");
}

#[tokio::test]
async fn refresh_with_unknown_token_is_403() {
    let app = build_test_app();

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh-token",
        json!({ "refreshToken": "00000000-0000-4000-8000-000000000000" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "TOKEN_REFRESH_ERROR");
    assert_eq!(json["error"], "Refresh token is not in database");
}

#[tokio::test]
async fn refresh_with_expired_token_is_403_and_consumes_it() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF"]).await;

    // Issue a token that is already expired by going below the service layer.
    let token = "expired-refresh-token";
    app.store
        .replace_for_user(&CreateRefreshToken {
            user_id: user.id,
            token_hash: hash_refresh_token(token),
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        })
        .await
        .unwrap();

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh-token",
        json!({ "refreshToken": token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.refresh_token_count(user.id).await, 0);
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn signup(username: &str, email: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": email,
        "phone": "555-0100",
        "password": "secret1",
        "firstName": "Dana",
        "lastName": "Scully",
        "address": "1 Garage Way"
    })
}

#[tokio::test]
async fn register_creates_customer_with_default_role() {
    let app = build_test_app();

    let response = post_json(
        app.router.clone(),
        "/api/v1/auth/register",
        signup("dana", "dana@garage.test"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["username"], "dana");
    assert_eq!(json["firstName"], "Dana");
    assert_eq!(json["address"], "1 Garage Way");
    assert_eq!(json["roles"], json!(["CUSTOMER"]));

    // The new account can log in.
    let login = app.login("dana", "secret1").await;
    assert_eq!(login["roles"], json!(["CUSTOMER"]));
}

#[tokio::test]
async fn register_duplicate_username_and_email_are_400() {
    let app = build_test_app();
    let first = post_json(
        app.router.clone(),
        "/api/v1/auth/register",
        signup("dana", "dana@garage.test"),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let same_name = post_json(
        app.router.clone(),
        "/api/v1/auth/register",
        signup("dana", "other@garage.test"),
    )
    .await;
    assert_eq!(same_name.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(same_name).await["code"], "USERNAME_TAKEN");

    let same_email = post_json(
        app.router.clone(),
        "/api/v1/auth/register",
        signup("fox", "dana@garage.test"),
    )
    .await;
    assert_eq!(same_email.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(same_email).await["code"], "EMAIL_TAKEN");
}

#[tokio::test]
async fn register_unknown_role_is_400() {
    let app = build_test_app();
    let mut body = signup("dana", "dana@garage.test");
    body["roles"] = json!(["PILOT"]);

    let response = post_json(app.router.clone(), "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "ROLE_NOT_FOUND");
}

#[tokio::test]
async fn register_invalid_fields_are_400() {
    let app = build_test_app();
    let mut body = signup("d", "not-an-email");
    body["password"] = json!("pw");

    let response = post_json(app.router.clone(), "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("username"));
    assert!(message.contains("email"));
    assert!(message.contains("password"));
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_revokes_own_refresh_token() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF"]).await;
    let login = app.login("alice", "pw123").await;
    let access = login["accessToken"].as_str().unwrap();

    let response =
        post_json_auth(app.router.clone(), "/api/v1/auth/logout", json!({}), access).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 1);
    assert_eq!(app.store.refresh_token_count(user.id).await, 0);

    // Already-issued access tokens stay valid until they expire.
    let me = get_auth(app.router.clone(), "/api/v1/auth/me", access).await;
    assert_eq!(me.status(), StatusCode::OK);

    // Logging out again deletes nothing and still succeeds.
    let again =
        post_json_auth(app.router.clone(), "/api/v1/auth/logout", json!({}), access).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_json(again).await["deleted"], 0);
}

#[tokio::test]
async fn logout_of_another_user_requires_admin() {
    let app = build_test_app();
    let victim = app.create_user("victim", "pw123", &["STAFF"]).await;
    app.create_user("mallory", "pw123", &["STAFF"]).await;
    app.create_user("root", "pw123", &["ADMIN"]).await;
    app.login("victim", "pw123").await;

    let uri = format!("/api/v1/auth/logout?userId={}", victim.id);

    let mallory = app.access_token("mallory", "pw123").await;
    let denied = post_json_auth(app.router.clone(), &uri, json!({}), &mallory).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.refresh_token_count(victim.id).await, 1);

    let root = app.access_token("root", "pw123").await;
    let allowed = post_json_auth(app.router.clone(), &uri, json!({}), &root).await;
    assert_eq!(allowed.status(), StatusCode::OK);
    assert_eq!(app.store.refresh_token_count(victim.id).await, 0);
}

// ---------------------------------------------------------------------------
// Request authorization filter and whitelist
// ---------------------------------------------------------------------------

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let app = build_test_app();

    let response = get(app.router.clone(), "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_tokens_leave_the_request_anonymous() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF"]).await;

    let expired = app
        .state
        .codec
        .encode(
            "alice",
            user.id,
            &user.roles,
            Utc::now() - chrono::Duration::hours(1),
        )
        .unwrap();

    for token in ["garbage", "a.b.c", expired.as_str()] {
        let response = get_auth(app.router.clone(), "/api/v1/auth/me", token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {token:?}");
    }

    // Public routes stay reachable with a bad token.
    let health = get_auth(app.router.clone(), "/health", "garbage").await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn me_reports_token_claims() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF", "RECEPTIONIST"]).await;
    let token = app.access_token("alice", "pw123").await;

    let response = get_auth(app.router.clone(), "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["userId"], user.id);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["roles"], json!(["STAFF", "RECEPTIONIST"]));
}

#[tokio::test]
async fn health_is_public() {
    let app = build_test_app();

    let response = get(app.router.clone(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dbHealthy"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app();
    let response = get(app.router.clone(), "/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

// ---------------------------------------------------------------------------
// Role gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_routes_require_admin() {
    let app = build_test_app();
    app.create_user("staff", "pw123", &["STAFF"]).await;
    app.create_user("root", "pw123", &["ADMIN"]).await;

    let staff = app.access_token("staff", "pw123").await;
    let response = get_auth(app.router.clone(), "/api/v1/admin/users", &staff).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let root = app.access_token("root", "pw123").await;
    let response = get_auth(app.router.clone(), "/api/v1/admin/users", &root).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert!(json["data"][0].get("passwordHash").is_none());
}

#[tokio::test]
async fn roles_listing_open_to_manager_but_not_staff() {
    let app = build_test_app();
    app.create_user("manager", "pw123", &["MANAGER"]).await;
    app.create_user("staff", "pw123", &["STAFF"]).await;

    let manager = app.access_token("manager", "pw123").await;
    let response = get_auth(app.router.clone(), "/api/v1/roles", &manager).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 5);

    let staff = app.access_token("staff", "pw123").await;
    let response = get_auth(app.router.clone(), "/api/v1/roles", &staff).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivating_a_user_revokes_their_session() {
    let app = build_test_app();
    let target = app.create_user("alice", "pw123", &["STAFF"]).await;
    app.create_user("root", "pw123", &["ADMIN"]).await;
    let login = app.login("alice", "pw123").await;

    let root = app.access_token("root", "pw123").await;
    let uri = format!("/api/v1/admin/users/{}/active", target.id);
    let response =
        put_json_auth(app.router.clone(), &uri, json!({ "isActive": false }), &root).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["isActive"], false);

    let refresh = post_json(
        app.router.clone(),
        "/api/v1/auth/refresh-token",
        json!({ "refreshToken": login["refreshToken"] }),
    )
    .await;
    assert_eq!(refresh.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_role_update_rejects_unknown_role_and_missing_user() {
    let app = build_test_app();
    let target = app.create_user("alice", "pw123", &["STAFF"]).await;
    app.create_user("root", "pw123", &["ADMIN"]).await;
    let root = app.access_token("root", "pw123").await;

    let uri = format!("/api/v1/admin/users/{}/roles", target.id);
    let response =
        put_json_auth(app.router.clone(), &uri, json!({ "roles": ["PILOT"] }), &root).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        app.router.clone(),
        "/api/v1/admin/users/9999/roles",
        json!({ "roles": ["STAFF"] }),
        &root,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn purge_removes_expired_tokens() {
    let app = build_test_app();
    let user = app.create_user("alice", "pw123", &["STAFF"]).await;
    app.create_user("root", "pw123", &["ADMIN"]).await;
    let root = app.access_token("root", "pw123").await;

    app.store
        .replace_for_user(&CreateRefreshToken {
            user_id: user.id,
            token_hash: "stale".into(),
            expires_at: Utc::now() - chrono::Duration::minutes(5),
        })
        .await
        .unwrap();

    let response = post_json_auth(
        app.router.clone(),
        "/api/v1/admin/refresh-tokens/purge",
        json!({}),
        &root,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["purged"], 1);
    assert_eq!(app.store.refresh_token_count(user.id).await, 0);
}
