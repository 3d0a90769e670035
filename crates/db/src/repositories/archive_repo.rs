//! Repository for the `archives` table and the archive-retro transaction.

use huddle_core::types::DbId;
use sqlx::PgPool;

use crate::models::archive::{Archive, FullArchive};
use crate::repositories::{ActionItemRepo, ItemRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, retro_id, created_at";

/// Provides archive creation and retrieval.
pub struct ArchiveRepo;

impl ArchiveRepo {
    /// Archive a retro's current state in a single transaction:
    ///
    /// 1. Create the archive row.
    /// 2. Stamp every current item with the archive id.
    /// 3. Stamp every current *done* action item with the archive id
    ///    (open action items stay with the retro).
    /// 4. Clear the retro's highlighted item.
    ///
    /// Returns the created archive row.
    pub async fn archive_retro(pool: &PgPool, retro_id: DbId) -> Result<Archive, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("INSERT INTO archives (retro_id) VALUES ($1) RETURNING {COLUMNS}");
        let archive = sqlx::query_as::<_, Archive>(&query)
            .bind(retro_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE items SET archive_id = $2 WHERE retro_id = $1 AND archive_id IS NULL")
            .bind(retro_id)
            .bind(archive.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE action_items SET archive_id = $2
             WHERE retro_id = $1 AND archive_id IS NULL AND done",
        )
        .bind(retro_id)
        .bind(archive.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE retros SET highlighted_item_id = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(retro_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(archive)
    }

    /// List a retro's archives, most recent first.
    pub async fn list_for_retro(pool: &PgPool, retro_id: DbId) -> Result<Vec<Archive>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM archives WHERE retro_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Archive>(&query)
            .bind(retro_id)
            .fetch_all(pool)
            .await
    }

    /// Find an archive by id within a retro.
    pub async fn find_for_retro(
        pool: &PgPool,
        retro_id: DbId,
        archive_id: DbId,
    ) -> Result<Option<Archive>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM archives WHERE id = $1 AND retro_id = $2");
        sqlx::query_as::<_, Archive>(&query)
            .bind(archive_id)
            .bind(retro_id)
            .fetch_optional(pool)
            .await
    }

    /// Attach the archive's frozen items and action items for serving.
    pub async fn load_full(pool: &PgPool, archive: Archive) -> Result<FullArchive, sqlx::Error> {
        let items = ItemRepo::list_by_archive(pool, archive.id).await?;
        let action_items = ActionItemRepo::list_by_archive(pool, archive.id).await?;
        Ok(FullArchive {
            archive,
            items,
            action_items,
        })
    }
}
