//! Retro item entity model and DTOs.

use huddle_core::types::{DbId, Timestamp};
use huddle_core::Category;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An item row from the `items` table.
///
/// `archive_id` is NULL while the item is current; archiving the retro
/// stamps it with the archive's id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub id: DbId,
    pub retro_id: DbId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<DbId>,
    pub category: Category,
    pub description: String,
    pub vote_count: i32,
    pub done: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItem {
    pub category: Category,
    pub description: String,
}
