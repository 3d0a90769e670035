//! Handlers for retro items.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::models::item::{CreateItem, Item};
use huddle_db::repositories::ItemRepo;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::{publish_retro_update, resolve_retro};
use crate::middleware::auth::{authorize_retro, RetroToken};
use crate::state::AppState;

/// Body of `POST /retros/{id}/items`, inside the `{"item": ...}` envelope.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemBody {
    pub category: huddle_core::Category,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub description: String,
}

/// Envelope for `POST /retros/{id}/items`.
#[derive(Debug, Deserialize)]
pub struct CreateItemPayload {
    pub item: CreateItemBody,
}

/// Body of `PATCH /retros/{id}/items/{item_id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemPayload {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub description: String,
}

/// Body of `PATCH /retros/{id}/items/{item_id}/done`.
#[derive(Debug, Deserialize)]
pub struct SetDonePayload {
    #[serde(default = "default_done")]
    pub done: bool,
}

fn default_done() -> bool {
    true
}

/// `{"item": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: Item,
}

/// POST /api/retros/{id}/items
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<CreateItemPayload>,
) -> AppResult<(StatusCode, Json<ItemResponse>)> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;
    payload.item.validate()?;

    let input = CreateItem {
        category: payload.item.category,
        description: payload.item.description,
    };
    let item = ItemRepo::create(&state.pool, retro.id, &input).await?;

    publish_retro_update(&state, retro.id).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

/// PATCH /api/retros/{id}/items/{item_id}
pub async fn update(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, DbId)>,
    token: RetroToken,
    Json(payload): Json<UpdateItemPayload>,
) -> AppResult<Json<ItemResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;
    payload.validate()?;

    let item = ItemRepo::update_description(&state.pool, retro.id, item_id, &payload.description)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Item", item_id)))?;

    publish_retro_update(&state, retro.id).await?;
    Ok(Json(ItemResponse { item }))
}

/// DELETE /api/retros/{id}/items/{item_id}
pub async fn delete(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, DbId)>,
    token: RetroToken,
) -> AppResult<StatusCode> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let deleted = ItemRepo::delete(&state.pool, retro.id, item_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::not_found("Item", item_id)));
    }

    publish_retro_update(&state, retro.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/retros/{id}/items/{item_id}/vote
pub async fn vote(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, DbId)>,
    token: RetroToken,
) -> AppResult<Json<ItemResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let item = ItemRepo::vote(&state.pool, retro.id, item_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Item", item_id)))?;

    publish_retro_update(&state, retro.id).await?;
    Ok(Json(ItemResponse { item }))
}

/// PATCH /api/retros/{id}/items/{item_id}/done
pub async fn set_done(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, DbId)>,
    token: RetroToken,
    Json(payload): Json<SetDonePayload>,
) -> AppResult<Json<ItemResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let item = ItemRepo::set_done(&state.pool, retro.id, item_id, payload.done)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Item", item_id)))?;

    publish_retro_update(&state, retro.id).await?;
    Ok(Json(ItemResponse { item }))
}
