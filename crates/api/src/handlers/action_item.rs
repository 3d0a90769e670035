//! Handlers for retro action items.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::models::action_item::{ActionItem, CreateActionItem, UpdateActionItem};
use huddle_db::repositories::ActionItemRepo;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::{publish_retro_update, resolve_retro};
use crate::middleware::auth::{authorize_retro, RetroToken};
use crate::state::AppState;

/// Body of `POST /retros/{id}/action_items`, inside the
/// `{"action_item": ...}` envelope.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateActionItemBody {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub description: String,
}

/// Envelope for `POST /retros/{id}/action_items`.
#[derive(Debug, Deserialize)]
pub struct CreateActionItemPayload {
    pub action_item: CreateActionItemBody,
}

/// Body of `PATCH /retros/{id}/action_items/{action_item_id}`. Both fields
/// optional: edits send `description`, done-toggles send `done`.
#[derive(Debug, Deserialize)]
pub struct UpdateActionItemPayload {
    pub description: Option<String>,
    pub done: Option<bool>,
}

/// `{"action_item": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct ActionItemResponse {
    pub action_item: ActionItem,
}

/// POST /api/retros/{id}/action_items
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<CreateActionItemPayload>,
) -> AppResult<(StatusCode, Json<ActionItemResponse>)> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;
    payload.action_item.validate()?;

    let input = CreateActionItem {
        description: payload.action_item.description,
    };
    let action_item = ActionItemRepo::create(&state.pool, retro.id, &input).await?;

    publish_retro_update(&state, retro.id).await?;
    Ok((StatusCode::CREATED, Json(ActionItemResponse { action_item })))
}

/// PATCH /api/retros/{id}/action_items/{action_item_id}
pub async fn update(
    State(state): State<AppState>,
    Path((id, action_item_id)): Path<(String, DbId)>,
    token: RetroToken,
    Json(payload): Json<UpdateActionItemPayload>,
) -> AppResult<Json<ActionItemResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    if let Some(description) = &payload.description {
        if description.is_empty() {
            return Err(AppError::Core(CoreError::Validation(
                "Description can't be blank".into(),
            )));
        }
    }

    let input = UpdateActionItem {
        description: payload.description,
        done: payload.done,
    };
    let action_item = ActionItemRepo::update(&state.pool, retro.id, action_item_id, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("ActionItem", action_item_id)))?;

    publish_retro_update(&state, retro.id).await?;
    Ok(Json(ActionItemResponse { action_item }))
}

/// DELETE /api/retros/{id}/action_items/{action_item_id}
pub async fn delete(
    State(state): State<AppState>,
    Path((id, action_item_id)): Path<(String, DbId)>,
    token: RetroToken,
) -> AppResult<StatusCode> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let deleted = ActionItemRepo::delete(&state.pool, retro.id, action_item_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::not_found(
            "ActionItem",
            action_item_id,
        )));
    }

    publish_retro_update(&state, retro.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
