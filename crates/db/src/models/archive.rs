//! Archive entity model.

use huddle_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::action_item::ActionItem;
use crate::models::item::Item;

/// An archive row from the `archives` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Archive {
    pub id: DbId,
    pub retro_id: DbId,
    pub created_at: Timestamp,
}

/// An archive with the items and action items frozen into it, as served
/// by `GET /retros/{id}/archives/{archive_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct FullArchive {
    #[serde(flatten)]
    pub archive: Archive,
    pub items: Vec<Item>,
    pub action_items: Vec<ActionItem>,
}
