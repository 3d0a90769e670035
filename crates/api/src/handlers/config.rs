//! Public configuration endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Feature flags the client reads at boot.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// Whether archive summary emails are available (SMTP configured).
    pub archive_emails: bool,
}

/// GET /api/config
pub async fn show(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        archive_emails: state.mailer.is_some(),
    })
}
