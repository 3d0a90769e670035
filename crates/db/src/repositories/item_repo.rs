//! Repository for the `items` table.

use huddle_core::types::DbId;
use sqlx::PgPool;

use crate::models::item::{CreateItem, Item};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, retro_id, archive_id, category, description, vote_count, done, created_at";

/// Provides CRUD operations for retro items.
pub struct ItemRepo;

impl ItemRepo {
    /// Insert a new item into a retro, returning the created row.
    pub async fn create(
        pool: &PgPool,
        retro_id: DbId,
        input: &CreateItem,
    ) -> Result<Item, sqlx::Error> {
        let query = format!(
            "INSERT INTO items (retro_id, category, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(retro_id)
            .bind(input.category)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a current item by id within a retro.
    pub async fn find_current(
        pool: &PgPool,
        retro_id: DbId,
        item_id: DbId,
    ) -> Result<Option<Item>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items
             WHERE id = $1 AND retro_id = $2 AND archive_id IS NULL"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(item_id)
            .bind(retro_id)
            .fetch_optional(pool)
            .await
    }

    /// List the retro's current (unarchived) items in creation order.
    /// Display ordering (votes, then age) is a presentation concern.
    pub async fn list_current(pool: &PgPool, retro_id: DbId) -> Result<Vec<Item>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items
             WHERE retro_id = $1 AND archive_id IS NULL
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(retro_id)
            .fetch_all(pool)
            .await
    }

    /// List the items frozen into an archive.
    pub async fn list_by_archive(
        pool: &PgPool,
        archive_id: DbId,
    ) -> Result<Vec<Item>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items WHERE archive_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(archive_id)
            .fetch_all(pool)
            .await
    }

    /// Update an item's description. Returns `None` if the item does not
    /// exist (or is archived).
    pub async fn update_description(
        pool: &PgPool,
        retro_id: DbId,
        item_id: DbId,
        description: &str,
    ) -> Result<Option<Item>, sqlx::Error> {
        let query = format!(
            "UPDATE items SET description = $3
             WHERE id = $1 AND retro_id = $2 AND archive_id IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(item_id)
            .bind(retro_id)
            .bind(description)
            .fetch_optional(pool)
            .await
    }

    /// Increment an item's vote count, returning the updated row.
    pub async fn vote(
        pool: &PgPool,
        retro_id: DbId,
        item_id: DbId,
    ) -> Result<Option<Item>, sqlx::Error> {
        let query = format!(
            "UPDATE items SET vote_count = vote_count + 1
             WHERE id = $1 AND retro_id = $2 AND archive_id IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(item_id)
            .bind(retro_id)
            .fetch_optional(pool)
            .await
    }

    /// Set an item's completion flag, returning the updated row.
    pub async fn set_done(
        pool: &PgPool,
        retro_id: DbId,
        item_id: DbId,
        done: bool,
    ) -> Result<Option<Item>, sqlx::Error> {
        let query = format!(
            "UPDATE items SET done = $3
             WHERE id = $1 AND retro_id = $2 AND archive_id IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(item_id)
            .bind(retro_id)
            .bind(done)
            .fetch_optional(pool)
            .await
    }

    /// Delete an item. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, retro_id: DbId, item_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND retro_id = $2")
            .bind(item_id)
            .bind(retro_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
