use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use huddle_api::auth::identity::{IdentityError, IdentityProvider, IdentityUser};
use huddle_api::auth::jwt::JwtConfig;
use huddle_api::config::ServerConfig;
use huddle_api::routes;
use huddle_api::state::AppState;
use huddle_api::ws::WsManager;

/// Access token the mock identity provider accepts.
pub const VALID_ACCESS_TOKEN: &str = "the-access-token";

/// Profile returned for [`VALID_ACCESS_TOKEN`].
pub fn mock_identity_user() -> IdentityUser {
    IdentityUser {
        name: "Felicity Frog".to_string(),
        email: "felicity@frog.com".to_string(),
        hosted_domain: Some("frog.com".to_string()),
    }
}

/// Identity provider that accepts exactly one access token.
pub struct MockIdentityProvider;

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        if access_token == VALID_ACCESS_TOKEN {
            Ok(mock_identity_user())
        } else {
            Err(IdentityError::InvalidToken)
        }
    }
}

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret
/// so tests can mint their own tokens.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        identity_userinfo_url: "http://localhost:9/unused".to_string(),
        jwt: test_jwt_config(),
    }
}

/// The JWT config shared by the test app and token-minting helpers.
pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        user_token_expiry_days: 1,
        retro_token_expiry_days: 1,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses. SMTP is left unconfigured.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let ws_manager = Arc::new(WsManager::new());
    let event_bus = Arc::new(huddle_events::EventBus::default());

    let state = AppState {
        pool,
        config: Arc::new(config),
        ws_manager,
        event_bus,
        identity: Arc::new(MockIdentityProvider),
        mailer: None,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Insert a user directly in the database.
pub async fn seed_user(pool: &PgPool, email: &str) -> huddle_db::models::user::User {
    let input = huddle_db::models::user::CreateUser {
        name: "Test User".to_string(),
        email: email.to_string(),
        company_name: None,
    };
    huddle_db::repositories::UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Insert a retro directly in the database.
pub async fn seed_retro(
    pool: &PgPool,
    owner_id: i64,
    slug: &str,
    password: Option<&str>,
    is_private: bool,
) -> huddle_db::models::retro::Retro {
    let password_hash = password.map(|p| {
        huddle_api::auth::password::hash_password(p).expect("hashing should succeed")
    });
    let input = huddle_db::models::retro::CreateRetro {
        slug: slug.to_string(),
        name: format!("{slug} retro"),
        owner_id,
        password_hash,
        is_private,
    };
    huddle_db::repositories::RetroRepo::create(pool, &input)
        .await
        .expect("retro creation should succeed")
}

/// Mint a user token with the test JWT config.
pub fn user_token(user_id: i64) -> String {
    huddle_api::auth::jwt::generate_user_token(user_id, &test_jwt_config())
        .expect("token generation should succeed")
}

/// Mint a retro token with the test JWT config.
pub fn retro_token(retro_id: i64) -> String {
    huddle_api::auth::jwt::generate_retro_token(retro_id, &test_jwt_config())
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Extra auth header applied to a request.
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    /// No auth header.
    None,
    /// Legacy `x-auth-token` user header.
    User(&'a str),
    /// `Authorization: Bearer` retro header.
    Retro(&'a str),
}

fn apply_auth<'a>(
    builder: axum::http::request::Builder,
    auth: Auth<'a>,
) -> axum::http::request::Builder {
    match auth {
        Auth::None => builder,
        Auth::User(token) => builder.header("x-auth-token", token),
        Auth::Retro(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
    }
}

/// Issue a request with a JSON body.
pub async fn request_json(
    app: Router,
    method: Method,
    uri: &str,
    auth: Auth<'_>,
    body: serde_json::Value,
) -> Response<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    let request = apply_auth(builder, auth)
        .body(Body::from(body.to_string()))
        .expect("request should build");

    app.oneshot(request).await.expect("request should succeed")
}

/// Issue a body-less request.
pub async fn request_empty(
    app: Router,
    method: Method,
    uri: &str,
    auth: Auth<'_>,
) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = apply_auth(builder, auth)
        .body(Body::empty())
        .expect("request should build");

    app.oneshot(request).await.expect("request should succeed")
}

/// GET without auth.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    request_empty(app, Method::GET, uri, Auth::None).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}
