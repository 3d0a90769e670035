//! Retro entity model and DTOs.

use huddle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::action_item::ActionItem;
use crate::models::item::Item;

/// A retro row from the `retros` table.
///
/// The password hash never leaves the server; the wire representation
/// exposes only whether a password is set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Retro {
    pub id: DbId,
    /// Human-readable, mutable, unique lookup key used in URLs.
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub owner_id: DbId,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_private: bool,
    pub video_link: Option<String>,
    pub highlighted_item_id: Option<DbId>,
    pub send_archive_email: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A retro with its current (unarchived) items and action items attached,
/// as served by `GET /retros/{id}` and pushed over the realtime channel.
#[derive(Debug, Clone, Serialize)]
pub struct FullRetro {
    #[serde(flatten)]
    pub retro: Retro,
    pub items: Vec<Item>,
    pub action_items: Vec<ActionItem>,
}

/// DTO for inserting a new retro. `password_hash` is pre-hashed by the
/// caller; the repository never sees plaintext passwords.
#[derive(Debug, Clone)]
pub struct CreateRetro {
    pub slug: String,
    pub name: String,
    pub owner_id: DbId,
    pub password_hash: Option<String>,
    pub is_private: bool,
}

/// DTO for updating retro settings. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRetroSettings {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_private: Option<bool>,
    pub video_link: Option<String>,
    pub send_archive_email: Option<bool>,
}
