//! Request handlers.
//!
//! Each submodule provides async handler functions for a single resource.
//! Handlers delegate to the corresponding repository in `huddle_db`, map
//! errors via [`AppError`], and publish a [`RetroEvent`] after every
//! successful mutation so realtime subscribers reconcile.

pub mod action_item;
pub mod archive;
pub mod config;
pub mod discussion;
pub mod item;
pub mod retro;
pub mod session;
pub mod user;

use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::models::retro::{FullRetro, Retro};
use huddle_db::repositories::RetroRepo;
use huddle_events::RetroEvent;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Resolve a route handle (slug or numeric id) to a retro, or 404.
pub(crate) async fn resolve_retro(state: &AppState, handle: &str) -> AppResult<Retro> {
    RetroRepo::find_by_handle(&state.pool, handle)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Retro", handle)))
}

/// Reload a retro with its collections and publish it to realtime
/// subscribers. Returns the loaded retro for reuse in the HTTP response.
///
/// The event payload is the same `{"retro": ...}` envelope the REST API
/// serves, forwarded verbatim to WebSocket clients.
pub(crate) async fn publish_retro_update(state: &AppState, retro_id: DbId) -> AppResult<FullRetro> {
    let retro = RetroRepo::find_by_id(&state.pool, retro_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Retro", retro_id)))?;
    let full = RetroRepo::load_full(&state.pool, retro).await?;

    state.event_bus.publish(RetroEvent::new(
        retro_id,
        "retro.updated",
        json!({ "retro": &full }),
    ));

    Ok(full)
}
