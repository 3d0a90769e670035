//! HTTP-level integration tests for user sessions and registration.
//!
//! Identity verification is mocked: exactly one access token maps to the
//! "Felicity Frog" profile.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, request_json, seed_retro, seed_user, Auth, VALID_ACCESS_TOKEN};
use sqlx::PgPool;

/// Login succeeds for an existing user and reports `new_user: true` while
/// they own no retros.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_session_existing_user(pool: PgPool) {
    seed_user(&pool, "felicity@frog.com").await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "access_token": VALID_ACCESS_TOKEN });
    let response = request_json(app, Method::POST, "/api/sessions", Auth::None, body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["auth_token"].is_string());
    assert_eq!(json["new_user"], true);
}

/// A user who already owns a retro is not a new user.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_session_user_with_retro(pool: PgPool) {
    let user = seed_user(&pool, "felicity@frog.com").await;
    seed_retro(&pool, user.id, "froggy-retro", None, false).await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "access_token": VALID_ACCESS_TOKEN });
    let response = request_json(app, Method::POST, "/api/sessions", Auth::None, body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["new_user"], false);
}

/// A verified email with no account is 404 (client redirects to signup).
#[sqlx::test(migrations = "../db/migrations")]
async fn test_session_unknown_email(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "access_token": VALID_ACCESS_TOKEN });
    let response = request_json(app, Method::POST, "/api/sessions", Auth::None, body).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// A rejected access token is 403.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_session_bad_access_token(pool: PgPool) {
    seed_user(&pool, "felicity@frog.com").await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "access_token": "forged" });
    let response = request_json(app, Method::POST, "/api/sessions", Auth::None, body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Registration creates the account and returns an auth token usable
/// against user endpoints.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_register_user(pool: PgPool) {
    let body = serde_json::json!({
        "access_token": VALID_ACCESS_TOKEN,
        "company_name": "Frog Corp",
    });
    let response = request_json(
        common::build_test_app(pool.clone()),
        Method::POST,
        "/api/users",
        Auth::None,
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let auth_token = json["auth_token"].as_str().unwrap().to_string();

    // The token works against a user-authenticated endpoint.
    let response = common::request_empty(
        common::build_test_app(pool),
        Method::GET,
        "/api/retros",
        Auth::User(&auth_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Registering the same email twice is a conflict.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_register_duplicate_email(pool: PgPool) {
    seed_user(&pool, "felicity@frog.com").await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "access_token": VALID_ACCESS_TOKEN });
    let response = request_json(app, Method::POST, "/api/users", Auth::None, body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// The config endpoint reports archive emails disabled without SMTP.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_config_endpoint(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = common::get(app, "/api/config").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["archive_emails"], false);
}
