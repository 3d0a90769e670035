//! Repository for the `retros` table.

use huddle_core::types::DbId;
use sqlx::PgPool;

use crate::models::retro::{CreateRetro, FullRetro, Retro, UpdateRetroSettings};
use crate::repositories::{ActionItemRepo, ItemRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, slug, name, owner_id, password_hash, is_private, video_link, \
                       highlighted_item_id, send_archive_email, created_at, updated_at";

/// Provides CRUD operations for retros.
pub struct RetroRepo;

impl RetroRepo {
    /// Insert a new retro, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateRetro) -> Result<Retro, sqlx::Error> {
        let query = format!(
            "INSERT INTO retros (slug, name, owner_id, password_hash, is_private)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Retro>(&query)
            .bind(&input.slug)
            .bind(&input.name)
            .bind(input.owner_id)
            .bind(&input.password_hash)
            .bind(input.is_private)
            .fetch_one(pool)
            .await
    }

    /// Find a retro by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Retro>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM retros WHERE id = $1");
        sqlx::query_as::<_, Retro>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a retro by its current slug.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Retro>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM retros WHERE slug = $1");
        sqlx::query_as::<_, Retro>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a route handle to a retro. Slugs take precedence; a handle
    /// that is not a current slug but parses as a number falls back to an
    /// id lookup (clients may hold pre-rename URLs).
    pub async fn find_by_handle(pool: &PgPool, handle: &str) -> Result<Option<Retro>, sqlx::Error> {
        if let Some(retro) = Self::find_by_slug(pool, handle).await? {
            return Ok(Some(retro));
        }
        match handle.parse::<DbId>() {
            Ok(id) => Self::find_by_id(pool, id).await,
            Err(_) => Ok(None),
        }
    }

    /// List all retros owned by a user, most recently created first.
    pub async fn list_for_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Retro>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM retros WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Retro>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Update retro settings. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_settings(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRetroSettings,
    ) -> Result<Option<Retro>, sqlx::Error> {
        let query = format!(
            "UPDATE retros SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                is_private = COALESCE($4, is_private),
                video_link = COALESCE($5, video_link),
                send_archive_email = COALESCE($6, send_archive_email),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Retro>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(input.is_private)
            .bind(&input.video_link)
            .bind(input.send_archive_email)
            .fetch_optional(pool)
            .await
    }

    /// Replace the retro's password hash. `None` removes the password.
    pub async fn update_password_hash(
        pool: &PgPool,
        id: DbId,
        password_hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE retros SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the highlighted item, returning the updated row.
    pub async fn set_highlighted_item(
        pool: &PgPool,
        id: DbId,
        item_id: Option<DbId>,
    ) -> Result<Option<Retro>, sqlx::Error> {
        let query = format!(
            "UPDATE retros SET highlighted_item_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Retro>(&query)
            .bind(id)
            .bind(item_id)
            .fetch_optional(pool)
            .await
    }

    /// Attach the retro's current items and action items for serving.
    pub async fn load_full(pool: &PgPool, retro: Retro) -> Result<FullRetro, sqlx::Error> {
        let items = ItemRepo::list_current(pool, retro.id).await?;
        let action_items = ActionItemRepo::list_current(pool, retro.id).await?;
        Ok(FullRetro {
            retro,
            items,
            action_items,
        })
    }
}
