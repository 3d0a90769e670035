//! Handlers for the `/retros` resource: creation, retrieval, settings,
//! password management, and retro login.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use huddle_core::error::CoreError;
use huddle_db::models::retro::{CreateRetro, FullRetro, Retro, UpdateRetroSettings};
use huddle_db::repositories::RetroRepo;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::auth::jwt::generate_retro_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::{publish_retro_update, resolve_retro};
use crate::middleware::auth::{authorize_retro, AuthUser, RetroToken};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Validator adapter over the domain slug rules.
fn slug_format(slug: &str) -> Result<(), ValidationError> {
    huddle_core::slug::validate_slug(slug).map_err(|e| {
        let mut err = ValidationError::new("slug_format");
        err.message = Some(e.to_string().into());
        err
    })
}

/// Body of `POST /retros`, inside the `{"retro": ...}` envelope.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRetroBody {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub name: String,
    #[validate(custom(function = slug_format))]
    pub slug: String,
    pub password: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Envelope for `POST /retros`.
#[derive(Debug, Deserialize)]
pub struct CreateRetroPayload {
    pub retro: CreateRetroBody,
}

/// Body of `PATCH /retros/{id}`, inside the `{"retro": ...}` envelope.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRetroBody {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub name: Option<String>,
    #[validate(custom(function = slug_format))]
    pub slug: Option<String>,
    pub is_private: Option<bool>,
    pub video_link: Option<String>,
    pub send_archive_email: Option<bool>,
}

/// Envelope for `PATCH /retros/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateRetroPayload {
    pub retro: UpdateRetroBody,
}

/// Body of `POST /retros/{id}/sessions` (retro login).
#[derive(Debug, Deserialize)]
pub struct RetroLoginPayload {
    pub retro: RetroLoginBody,
}

#[derive(Debug, Deserialize)]
pub struct RetroLoginBody {
    #[serde(default)]
    pub password: String,
}

/// Body of `PATCH /retros/{id}/password`.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordPayload {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// `{"retro": ...}` envelope with items attached.
#[derive(Debug, Serialize)]
pub struct RetroResponse {
    pub retro: FullRetro,
}

/// Response of `POST /retros`: the new retro plus its access token.
#[derive(Debug, Serialize)]
pub struct RetroCreatedResponse {
    pub retro: FullRetro,
    pub token: String,
}

/// `{"retros": [...]}` envelope without items.
#[derive(Debug, Serialize)]
pub struct RetroListResponse {
    pub retros: Vec<Retro>,
}

/// `{"retro": ...}` envelope without items (settings view).
#[derive(Debug, Serialize)]
pub struct RetroSettingsResponse {
    pub retro: Retro,
}

/// `{"token": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

fn mint_retro_token(state: &AppState, retro_id: i64) -> AppResult<String> {
    generate_retro_token(retro_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Failed to generate retro token: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/retros
///
/// Create a retro owned by the authenticated user. Returns the retro and
/// a retro-scoped access token.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateRetroPayload>,
) -> AppResult<(StatusCode, Json<RetroCreatedResponse>)> {
    payload.retro.validate()?;

    let password_hash = match payload.retro.password.as_deref() {
        Some(p) if !p.is_empty() => Some(
            hash_password(p)
                .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?,
        ),
        _ => None,
    };

    let input = CreateRetro {
        slug: payload.retro.slug,
        name: payload.retro.name,
        owner_id: user.user_id,
        password_hash,
        is_private: payload.retro.is_private,
    };

    let retro = RetroRepo::create(&state.pool, &input).await?;
    let token = mint_retro_token(&state, retro.id)?;
    let full = RetroRepo::load_full(&state.pool, retro).await?;

    Ok((
        StatusCode::CREATED,
        Json(RetroCreatedResponse { retro: full, token }),
    ))
}

/// GET /api/retros
///
/// List the authenticated user's retros.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<RetroListResponse>> {
    let retros = RetroRepo::list_for_owner(&state.pool, user.user_id).await?;
    Ok(Json(RetroListResponse { retros }))
}

/// GET /api/retros/{id}
///
/// The full retro with current items and action items.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
) -> AppResult<Json<RetroResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;
    let full = RetroRepo::load_full(&state.pool, retro).await?;
    Ok(Json(RetroResponse { retro: full }))
}

/// GET /api/retros/{id}/settings
pub async fn settings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
) -> AppResult<Json<RetroSettingsResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;
    Ok(Json(RetroSettingsResponse { retro }))
}

/// PATCH /api/retros/{id}
///
/// Update retro settings (name, slug, privacy, video link). A slug change
/// invalidates nothing server-side — retro tokens are bound to the stable
/// id — but clients must migrate their cached token key.
pub async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<UpdateRetroPayload>,
) -> AppResult<Json<RetroResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;
    payload.retro.validate()?;

    let input = UpdateRetroSettings {
        name: payload.retro.name,
        slug: payload.retro.slug,
        is_private: payload.retro.is_private,
        video_link: payload.retro.video_link,
        send_archive_email: payload.retro.send_archive_email,
    };

    RetroRepo::update_settings(&state.pool, retro.id, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Retro", retro.id)))?;

    let full = publish_retro_update(&state, retro.id).await?;
    Ok(Json(RetroResponse { retro: full }))
}

/// PATCH /api/retros/{id}/password
///
/// Change the retro password. Requires the current password; returns a
/// fresh access token.
pub async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<UpdatePasswordPayload>,
) -> AppResult<Json<TokenResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let current_ok = match retro.password_hash.as_deref() {
        Some(hash) => verify_password(&payload.current_password, hash)
            .map_err(|e| AppError::InternalError(format!("Password verify failed: {e}")))?,
        None => payload.current_password.is_empty(),
    };
    if !current_ok {
        return Err(AppError::Unprocessable(json!({
            "current_password": ["is incorrect"]
        })));
    }

    let new_hash = if payload.new_password.is_empty() {
        None
    } else {
        Some(
            hash_password(&payload.new_password)
                .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?,
        )
    };

    RetroRepo::update_password_hash(&state.pool, retro.id, new_hash.as_deref()).await?;

    let token = mint_retro_token(&state, retro.id)?;
    Ok(Json(TokenResponse { token }))
}

/// GET /api/retros/{id}/sessions/new
///
/// Public login info for the retro password form.
pub async fn login_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let retro = resolve_retro(&state, &id).await?;
    Ok(Json(json!({
        "retro": {
            "id": retro.id,
            "slug": retro.slug,
            "name": retro.name,
        }
    })))
}

/// POST /api/retros/{id}/sessions
///
/// Retro login: exchange the retro password for an access token.
pub async fn login(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RetroLoginPayload>,
) -> AppResult<Json<TokenResponse>> {
    let retro = resolve_retro(&state, &id).await?;

    let ok = match retro.password_hash.as_deref() {
        Some(hash) => verify_password(&payload.retro.password, hash)
            .map_err(|e| AppError::InternalError(format!("Password verify failed: {e}")))?,
        None => true,
    };
    if !ok {
        return Err(AppError::Core(CoreError::Forbidden(
            "Incorrect password".into(),
        )));
    }

    let token = mint_retro_token(&state, retro.id)?;
    Ok(Json(TokenResponse { token }))
}
