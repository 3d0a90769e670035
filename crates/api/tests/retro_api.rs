//! HTTP-level integration tests for the `/retros` resource: creation,
//! access control, settings (including renames), and password management.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    body_json, get, request_empty, request_json, retro_token, seed_retro, seed_user, user_token,
    Auth,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Creating a retro requires the legacy user auth header.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_retro_requires_user_auth(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "retro": { "name": "Team Retro", "slug": "team-retro" } });
    let response = request_json(app, Method::POST, "/api/retros", Auth::None, body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Successful creation returns 201 with the retro and an access token.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_retro_success(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let token = user_token(user.id);
    let app = common::build_test_app(pool);

    let body = serde_json::json!({
        "retro": { "name": "Team Retro", "slug": "team-retro", "password": "icecream" }
    });
    let response =
        request_json(app, Method::POST, "/api/retros", Auth::User(&token), body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["retro"]["slug"], "team-retro");
    assert_eq!(json["retro"]["name"], "Team Retro");
    assert!(json["retro"]["items"].as_array().unwrap().is_empty());
    assert!(json["token"].is_string(), "response must contain a retro token");
    // The password hash must never appear on the wire.
    assert!(json["retro"].get("password_hash").is_none());
}

/// A duplicate slug is a validation failure, not a conflict.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_retro_duplicate_slug(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "taken-slug", None, false).await;
    let token = user_token(user.id);
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "retro": { "name": "Another", "slug": "taken-slug" } });
    let response =
        request_json(app, Method::POST, "/api/retros", Auth::User(&token), body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["slug"][0], "has already been taken");
}

/// Blank names and malformed slugs fail field validation with 422.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_retro_invalid_fields(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let token = user_token(user.id);

    let body = serde_json::json!({ "retro": { "name": "", "slug": "ok-slug" } });
    let response = request_json(
        common::build_test_app(pool.clone()),
        Method::POST,
        "/api/retros",
        Auth::User(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = serde_json::json!({ "retro": { "name": "Fine", "slug": "not a slug!" } });
    let response = request_json(
        common::build_test_app(pool),
        Method::POST,
        "/api/retros",
        Auth::User(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

/// Listing returns only the caller's retros.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_retros_scoped_to_owner(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    seed_retro(&pool, alice.id, "alice-retro", None, false).await;
    seed_retro(&pool, bob.id, "bob-retro", None, false).await;

    let token = user_token(alice.id);
    let app = common::build_test_app(pool);

    let response = request_empty(app, Method::GET, "/api/retros", Auth::User(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let retros = json["retros"].as_array().unwrap();
    assert_eq!(retros.len(), 1);
    assert_eq!(retros[0]["slug"], "alice-retro");
}

// ---------------------------------------------------------------------------
// Retrieval and access control
// ---------------------------------------------------------------------------

/// A public retro is readable without any token.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_public_retro(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "open-retro", None, false).await;
    let app = common::build_test_app(pool);

    let response = get(app, "/api/retros/open-retro").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["retro"]["slug"], "open-retro");
    assert!(json["retro"]["items"].as_array().unwrap().is_empty());
    assert!(json["retro"]["action_items"].as_array().unwrap().is_empty());
}

/// A numeric id resolves when the handle is not a current slug.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_retro_by_numeric_id(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let retro = seed_retro(&pool, user.id, "numbered", None, false).await;
    let app = common::build_test_app(pool);

    let response = get(app, &format!("/api/retros/{}", retro.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// An unknown handle is 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_retro_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/retros/no-such-retro").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// A password-protected retro requires a retro token; 403 prompts login.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_protected_retro_requires_token(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let retro = seed_retro(&pool, user.id, "secret-retro", Some("icecream"), false).await;

    let response = get(common::build_test_app(pool.clone()), "/api/retros/secret-retro").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let token = retro_token(retro.id);
    let response = request_empty(
        common::build_test_app(pool),
        Method::GET,
        "/api/retros/secret-retro",
        Auth::Retro(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// A token minted for one retro does not open another.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_retro_token_is_scoped(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "first", Some("pw-one"), false).await;
    let second = seed_retro(&pool, user.id, "second", Some("pw-two"), false).await;

    let token = retro_token(second.id);
    let response = request_empty(
        common::build_test_app(pool),
        Method::GET,
        "/api/retros/first",
        Auth::Retro(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Retro login
// ---------------------------------------------------------------------------

/// The login info endpoint is public and exposes only identity fields.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_retro_login_info(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "guarded", Some("icecream"), true).await;
    let app = common::build_test_app(pool);

    let response = get(app, "/api/retros/guarded/sessions/new").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["retro"]["slug"], "guarded");
    assert!(json["retro"].get("items").is_none());
}

/// Correct password yields a token; the token then opens the retro.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_retro_login_success(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "guarded", Some("icecream"), false).await;

    let body = serde_json::json!({ "retro": { "password": "icecream" } });
    let response = request_json(
        common::build_test_app(pool.clone()),
        Method::POST,
        "/api/retros/guarded/sessions",
        Auth::None,
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let token = json["token"].as_str().expect("token should be a string");

    let response = request_empty(
        common::build_test_app(pool),
        Method::GET,
        "/api/retros/guarded",
        Auth::Retro(token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Wrong password is 403.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_retro_login_wrong_password(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "guarded", Some("icecream"), false).await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "retro": { "password": "sorbet" } });
    let response = request_json(
        app,
        Method::POST,
        "/api/retros/guarded/sessions",
        Auth::None,
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Renaming a slug relocates the retro; the old token keeps working
/// because tokens are bound to the stable id.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_settings_rename_slug(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let retro = seed_retro(&pool, user.id, "old-slug", Some("icecream"), false).await;
    let token = retro_token(retro.id);

    let body = serde_json::json!({ "retro": { "slug": "new-slug", "name": "Renamed" } });
    let response = request_json(
        common::build_test_app(pool.clone()),
        Method::PATCH,
        "/api/retros/old-slug",
        Auth::Retro(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["retro"]["slug"], "new-slug");
    assert_eq!(json["retro"]["name"], "Renamed");

    // Old slug no longer resolves; the same token opens the new slug.
    let response = get(common::build_test_app(pool.clone()), "/api/retros/old-slug").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = request_empty(
        common::build_test_app(pool),
        Method::GET,
        "/api/retros/new-slug",
        Auth::Retro(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Renaming onto an existing slug is a 422 with a field error.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_settings_duplicate_slug(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "taken", None, false).await;
    let retro = seed_retro(&pool, user.id, "renaming", None, false).await;
    let token = retro_token(retro.id);
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "retro": { "slug": "taken" } });
    let response = request_json(
        app,
        Method::PATCH,
        "/api/retros/renaming",
        Auth::Retro(&token),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["slug"][0], "has already been taken");
}

/// The settings view serves the retro without its collections.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_settings(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    seed_retro(&pool, user.id, "configurable", None, false).await;
    let app = common::build_test_app(pool);

    let response = get(app, "/api/retros/configurable/settings").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["retro"]["slug"], "configurable");
    assert!(json["retro"].get("items").is_none());
}

// ---------------------------------------------------------------------------
// Password changes
// ---------------------------------------------------------------------------

/// Changing the password requires the current one and returns a new token.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_password_success(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let retro = seed_retro(&pool, user.id, "locked", Some("old-password"), false).await;
    let token = retro_token(retro.id);

    let body = serde_json::json!({
        "current_password": "old-password",
        "new_password": "new-password",
    });
    let response = request_json(
        common::build_test_app(pool.clone()),
        Method::PATCH,
        "/api/retros/locked/password",
        Auth::Retro(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["token"].is_string());

    // The new password now logs in; the old one does not.
    let body = serde_json::json!({ "retro": { "password": "new-password" } });
    let response = request_json(
        common::build_test_app(pool.clone()),
        Method::POST,
        "/api/retros/locked/sessions",
        Auth::None,
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = serde_json::json!({ "retro": { "password": "old-password" } });
    let response = request_json(
        common::build_test_app(pool),
        Method::POST,
        "/api/retros/locked/sessions",
        Auth::None,
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// A wrong current password is a 422 with a field error.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_password_wrong_current(pool: PgPool) {
    let user = seed_user(&pool, "owner@example.com").await;
    let retro = seed_retro(&pool, user.id, "locked", Some("real-password"), false).await;
    let token = retro_token(retro.id);
    let app = common::build_test_app(pool);

    let body = serde_json::json!({
        "current_password": "guessed-wrong",
        "new_password": "whatever",
    });
    let response = request_json(
        app,
        Method::PATCH,
        "/api/retros/locked/password",
        Auth::Retro(&token),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["current_password"][0], "is incorrect");
}
