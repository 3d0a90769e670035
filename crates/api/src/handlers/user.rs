//! Handlers for user registration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use huddle_core::error::CoreError;
use huddle_db::models::user::CreateUser;
use huddle_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_user_token;
use crate::error::{AppError, AppResult};
use crate::handlers::session::map_identity_error;
use crate::state::AppState;

/// Body of `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub access_token: String,
    /// Display name override; falls back to the provider profile name.
    pub full_name: Option<String>,
    pub company_name: Option<String>,
}

/// Registration response.
#[derive(Debug, Serialize)]
pub struct UserCreatedResponse {
    pub auth_token: String,
}

/// POST /api/users
///
/// Verify the provider access token and create an account for the
/// verified email. Registering an email that already has an account is a
/// conflict.
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> AppResult<(StatusCode, Json<UserCreatedResponse>)> {
    let identity = state
        .identity
        .verify(&payload.access_token)
        .await
        .map_err(map_identity_error)?;

    if UserRepo::find_by_email(&state.pool, &identity.email)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "An account already exists for this email".into(),
        )));
    }

    let input = CreateUser {
        name: payload.full_name.unwrap_or(identity.name),
        email: identity.email,
        company_name: payload.company_name,
    };
    let user = UserRepo::create(&state.pool, &input).await?;

    let auth_token = generate_user_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Failed to generate user token: {e}")))?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserCreatedResponse { auth_token })))
}
