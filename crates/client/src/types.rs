//! Client-side projections of the server's wire types.
//!
//! These are cached copies, never authoritative: every successful
//! mutation response or broadcast message replaces them wholesale.

use huddle_core::types::{DbId, Timestamp};
use huddle_core::Category;
use serde::{Deserialize, Serialize};

/// A retro as served by the API, with its collections attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retro {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub video_link: Option<String>,
    #[serde(default)]
    pub highlighted_item_id: Option<DbId>,
    #[serde(default)]
    pub send_archive_email: bool,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
}

/// A feedback item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: DbId,
    pub category: Category,
    pub description: String,
    #[serde(default)]
    pub vote_count: i32,
    #[serde(default)]
    pub done: bool,
    pub created_at: Timestamp,
}

/// A follow-up task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: DbId,
    pub description: String,
    #[serde(default)]
    pub done: bool,
}

impl Retro {
    /// Sort items for display: highest vote count first, oldest first on
    /// ties. This ordering is applied on every item mutation so the
    /// rendered list is always current.
    pub fn sort_items(&mut self) {
        self.items.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
    }
}
