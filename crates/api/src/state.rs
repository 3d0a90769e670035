use std::sync::Arc;

use crate::auth::identity::IdentityProvider;
use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: huddle_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (retro subscribers).
    pub ws_manager: Arc<WsManager>,
    /// Centralized event bus for publishing retro mutations.
    pub event_bus: Arc<huddle_events::EventBus>,
    /// External identity verification for user login/registration.
    pub identity: Arc<dyn IdentityProvider>,
    /// Archive email delivery; `None` when SMTP is not configured.
    pub mailer: Option<Arc<huddle_events::EmailDelivery>>,
}
