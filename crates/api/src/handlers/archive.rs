//! Handlers for retro archives.

use axum::extract::{Path, State};
use axum::Json;
use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::models::archive::{Archive, FullArchive};
use huddle_db::repositories::{ArchiveRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::retro::RetroResponse;
use crate::handlers::{publish_retro_update, resolve_retro};
use crate::middleware::auth::{authorize_retro, RetroToken};
use crate::state::AppState;

/// Body of `POST /retros/{id}/archives`.
#[derive(Debug, Default, Deserialize)]
pub struct ArchivePayload {
    /// Overrides the retro's own `send_archive_email` flag when present.
    pub send_archive_email: Option<bool>,
}

/// `{"archives": [...]}` envelope.
#[derive(Debug, Serialize)]
pub struct ArchiveListResponse {
    pub archives: Vec<Archive>,
}

/// `{"retro": ...}` envelope for a single archive's frozen contents.
#[derive(Debug, Serialize)]
pub struct ArchiveShowResponse {
    pub retro: FullArchive,
}

/// POST /api/retros/{id}/archives
///
/// Archive the retro's current items and done action items, then email a
/// summary to the owner when enabled and SMTP is configured.
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
    Json(payload): Json<ArchivePayload>,
) -> AppResult<Json<RetroResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let archive = ArchiveRepo::archive_retro(&state.pool, retro.id).await?;

    let send_email = payload.send_archive_email.unwrap_or(retro.send_archive_email);
    if send_email {
        if let Some(mailer) = state.mailer.clone() {
            let full = ArchiveRepo::load_full(&state.pool, archive).await?;
            let owner = UserRepo::find_by_id(&state.pool, retro.owner_id).await?;
            if let Some(owner) = owner {
                let retro_name = retro.name.clone();
                let summary = render_archive_summary(&full);
                // Delivery happens off the request path; a failed send is
                // logged, never surfaced to the archiving user.
                tokio::spawn(async move {
                    if let Err(e) = mailer
                        .send_archive_summary(&owner.email, &retro_name, &summary)
                        .await
                    {
                        tracing::warn!(error = %e, "Archive summary email failed");
                    }
                });
            }
        }
    }

    let full = publish_retro_update(&state, retro.id).await?;
    Ok(Json(RetroResponse { retro: full }))
}

/// GET /api/retros/{id}/archives
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: RetroToken,
) -> AppResult<Json<ArchiveListResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let archives = ArchiveRepo::list_for_retro(&state.pool, retro.id).await?;
    Ok(Json(ArchiveListResponse { archives }))
}

/// GET /api/retros/{id}/archives/{archive_id}
pub async fn show(
    State(state): State<AppState>,
    Path((id, archive_id)): Path<(String, DbId)>,
    token: RetroToken,
) -> AppResult<Json<ArchiveShowResponse>> {
    let retro = resolve_retro(&state, &id).await?;
    authorize_retro(&retro, &token)?;

    let archive = ArchiveRepo::find_for_retro(&state.pool, retro.id, archive_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Archive", archive_id)))?;
    let full = ArchiveRepo::load_full(&state.pool, archive).await?;

    Ok(Json(ArchiveShowResponse { retro: full }))
}

/// Render the plain-text archive summary for the owner email.
fn render_archive_summary(archive: &FullArchive) -> String {
    let mut out = String::new();

    out.push_str("Items:\n");
    if archive.items.is_empty() {
        out.push_str("  (none)\n");
    }
    for item in &archive.items {
        out.push_str(&format!(
            "  [{}] {} ({} votes)\n",
            item.category, item.description, item.vote_count
        ));
    }

    out.push_str("\nCompleted action items:\n");
    if archive.action_items.is_empty() {
        out.push_str("  (none)\n");
    }
    for action_item in &archive.action_items {
        out.push_str(&format!("  - {}\n", action_item.description));
    }

    out
}
