//! Repository for the `action_items` table.

use huddle_core::types::DbId;
use sqlx::PgPool;

use crate::models::action_item::{ActionItem, CreateActionItem, UpdateActionItem};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, retro_id, archive_id, description, done, created_at";

/// Provides CRUD operations for action items.
pub struct ActionItemRepo;

impl ActionItemRepo {
    /// Insert a new action item, returning the created row.
    pub async fn create(
        pool: &PgPool,
        retro_id: DbId,
        input: &CreateActionItem,
    ) -> Result<ActionItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO action_items (retro_id, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionItem>(&query)
            .bind(retro_id)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// List the retro's current (unarchived) action items in creation order.
    pub async fn list_current(
        pool: &PgPool,
        retro_id: DbId,
    ) -> Result<Vec<ActionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_items
             WHERE retro_id = $1 AND archive_id IS NULL
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, ActionItem>(&query)
            .bind(retro_id)
            .fetch_all(pool)
            .await
    }

    /// List the action items frozen into an archive.
    pub async fn list_by_archive(
        pool: &PgPool,
        archive_id: DbId,
    ) -> Result<Vec<ActionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_items WHERE archive_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, ActionItem>(&query)
            .bind(archive_id)
            .fetch_all(pool)
            .await
    }

    /// Update an action item. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if the action item does not exist (or is archived).
    pub async fn update(
        pool: &PgPool,
        retro_id: DbId,
        action_item_id: DbId,
        input: &UpdateActionItem,
    ) -> Result<Option<ActionItem>, sqlx::Error> {
        let query = format!(
            "UPDATE action_items SET
                description = COALESCE($3, description),
                done = COALESCE($4, done)
             WHERE id = $1 AND retro_id = $2 AND archive_id IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionItem>(&query)
            .bind(action_item_id)
            .bind(retro_id)
            .bind(&input.description)
            .bind(input.done)
            .fetch_optional(pool)
            .await
    }

    /// Delete an action item. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        retro_id: DbId,
        action_item_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM action_items WHERE id = $1 AND retro_id = $2")
            .bind(action_item_id)
            .bind(retro_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
