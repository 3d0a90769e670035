//! Handlers for the discussion flow: highlighting items and advancing to
//! the next one.

use axum::extract::{Path, State};
use axum::Json;
use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::models::item::Item;
use huddle_db::repositories::{ItemRepo, RetroRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::retro::RetroResponse;
use crate::handlers::{publish_retro_update, resolve_retro};
use crate::middleware::auth::{authorize_retro, RetroToken};
use crate::state::AppState;

/// Body of `POST /retros/{id}/discussion`.
#[derive(Debug, Deserialize)]
pub struct HighlightPayload {
    pub item_id: DbId,
}

/// Body of `POST /retros/{id}/discussion/transitions`.
#[derive(Debug, Deserialize)]
pub struct TransitionPayload {
    pub transition: String,
}

/// POST /api/retros/{id}/discussion
///
/// Highlight an item for discussion.
pub async fn highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<HighlightPayload>,
) -> AppResult<Json<RetroResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    // The item must be current in this retro.
    ItemRepo::find_current(&state.pool, retro.id, payload.item_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Item", payload.item_id)))?;

    RetroRepo::set_highlighted_item(&state.pool, retro.id, Some(payload.item_id)).await?;

    let full = publish_retro_update(&state, retro.id).await?;
    Ok(Json(RetroResponse { retro: full }))
}

/// DELETE /api/retros/{id}/discussion
///
/// Clear the highlighted item.
pub async fn unhighlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
) -> AppResult<Json<RetroResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    RetroRepo::set_highlighted_item(&state.pool, retro.id, None).await?;

    let full = publish_retro_update(&state, retro.id).await?;
    Ok(Json(RetroResponse { retro: full }))
}

/// POST /api/retros/{id}/discussion/transitions
///
/// Advance the discussion: mark the highlighted item done and highlight
/// the next undiscussed item (highest votes first, oldest breaks ties).
/// Only the `NEXT` transition exists.
pub async fn transition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<TransitionPayload>,
) -> AppResult<Json<RetroResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    if payload.transition != "NEXT" {
        return Err(AppError::BadRequest(format!(
            "Unknown transition '{}'",
            payload.transition
        )));
    }

    if let Some(current_id) = retro.highlighted_item_id {
        ItemRepo::set_done(&state.pool, retro.id, current_id, true).await?;
    }

    let items = ItemRepo::list_current(&state.pool, retro.id).await?;
    let next = next_discussion_item(&items, retro.highlighted_item_id);
    RetroRepo::set_highlighted_item(&state.pool, retro.id, next).await?;

    let full = publish_retro_update(&state, retro.id).await?;
    Ok(Json(RetroResponse { retro: full }))
}

/// Pick the next item to discuss: not done, not the one just finished,
/// highest vote count first, oldest first on ties.
fn next_discussion_item(items: &[Item], finished: Option<DbId>) -> Option<DbId> {
    items
        .iter()
        .filter(|item| !item.done && Some(item.id) != finished)
        .max_by(|a, b| {
            a.vote_count
                .cmp(&b.vote_count)
                .then_with(|| b.created_at.cmp(&a.created_at))
        })
        .map(|item| item.id)
}
