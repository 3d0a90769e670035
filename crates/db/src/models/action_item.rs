//! Action item entity model and DTOs.

use huddle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An action item row from the `action_items` table.
///
/// Action items outlive the meeting: archiving a retro only archives the
/// ones already marked done.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActionItem {
    pub id: DbId,
    pub retro_id: DbId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<DbId>,
    pub description: String,
    pub done: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new action item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActionItem {
    pub description: String,
}

/// DTO for updating an action item. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateActionItem {
    pub description: Option<String>,
    pub done: Option<bool>,
}
