//! Handlers for user sessions (login via the external identity provider).

use axum::extract::State;
use axum::Json;
use huddle_core::error::CoreError;
use huddle_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::identity::IdentityError;
use crate::auth::jwt::generate_user_token;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /sessions`.
#[derive(Debug, Deserialize)]
pub struct CreateSessionPayload {
    pub access_token: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub auth_token: String,
    /// `true` until the user owns a retro; drives post-login routing.
    pub new_user: bool,
}

/// POST /api/sessions
///
/// Verify the provider access token and exchange it for a user JWT.
/// Returns 404 when the verified email has no account yet — the client
/// redirects to registration.
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionPayload>,
) -> AppResult<Json<SessionResponse>> {
    let identity = state
        .identity
        .verify(&payload.access_token)
        .await
        .map_err(map_identity_error)?;

    let user = UserRepo::find_by_email(&state.pool, &identity.email)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", &identity.email)))?;

    let auth_token = generate_user_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Failed to generate user token: {e}")))?;
    let new_user = !UserRepo::has_retros(&state.pool, user.id).await?;

    tracing::info!(user_id = user.id, new_user, "User logged in");
    Ok(Json(SessionResponse {
        auth_token,
        new_user,
    }))
}

pub(crate) fn map_identity_error(err: IdentityError) -> AppError {
    match err {
        IdentityError::InvalidToken => {
            AppError::Core(CoreError::Forbidden("Access token rejected".into()))
        }
        IdentityError::Transport(e) => {
            AppError::InternalError(format!("Identity provider unreachable: {e}"))
        }
    }
}
