//! Route definitions.

pub mod health;
pub mod retro;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// /ws                      WebSocket upgrade (query: retro_id, api_token)
/// /config                  public feature config
/// /sessions                user login via provider access token
/// /users                   user registration
/// /retros/...              retro resources (see routes::retro)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/config", get(handlers::config::show))
        .route("/sessions", post(handlers::session::create))
        .route("/users", post(handlers::user::create))
        .nest("/retros", retro::router())
}
