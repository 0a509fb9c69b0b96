use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use shared::domain::{Item, ItemId, Rating, Review, ReviewDraft, ReviewFields, ReviewId};

mod repository;

pub use repository::{ItemStore, ReviewLedger, ReviewStore};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let in_memory = is_in_memory(database_url);
        let mut connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // Each connection to an in-memory url opens a private database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Adds a catalog item. Catalog management lives elsewhere; this seeds fixtures.
    pub async fn insert_item(&self, title: &str) -> Result<Item> {
        let row = sqlx::query(
            "INSERT INTO items (id, title) VALUES (?, ?)
             RETURNING id, title, is_deleted, review_count",
        )
        .bind(ItemId::generate().to_string())
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert item")?;
        item_from_row(&row)
    }

    pub async fn soft_delete_item(&self, id: &ItemId) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Recomputes every drifted review counter from the active reviews.
    /// Returns the number of items that were corrected.
    pub async fn reconcile_review_counts(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE items
             SET review_count = (
                 SELECT COUNT(*) FROM reviews r WHERE r.item_id = items.id AND r.is_deleted = 0
             )
             WHERE review_count <> (
                 SELECT COUNT(*) FROM reviews r WHERE r.item_id = items.id AND r.is_deleted = 0
             )",
        )
        .execute(&self.pool)
        .await
        .context("failed to reconcile review counts")?;
        Ok(result.rows_affected())
    }
}

async fn insert_review(conn: &mut SqliteConnection, draft: &ReviewDraft) -> Result<Review> {
    let row = sqlx::query(
        "INSERT INTO reviews (id, item_id, reviewed_by, text, rating, reviewed_at, is_deleted)
         VALUES (?, ?, ?, ?, ?, ?, 0)
         RETURNING id, item_id, reviewed_by, text, rating, reviewed_at, is_deleted",
    )
    .bind(ReviewId::generate().to_string())
    .bind(draft.item_id.as_str())
    .bind(draft.reviewed_by.as_str())
    .bind(draft.text.as_deref())
    .bind(i64::from(draft.rating))
    .bind(draft.reviewed_at)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("failed to insert review for item {}", draft.item_id))?;
    review_from_row(&row)
}

async fn adjust_review_count(
    conn: &mut SqliteConnection,
    id: &ItemId,
    delta: i64,
) -> Result<Option<Item>> {
    let row = sqlx::query(
        "UPDATE items SET review_count = review_count + ?
         WHERE id = ? AND is_deleted = 0
         RETURNING id, title, is_deleted, review_count",
    )
    .bind(delta)
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("failed to adjust review count of item {id}"))?;
    row.as_ref().map(item_from_row).transpose()
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    let id: String = row.try_get("id")?;
    let review_count: i64 = row.try_get("review_count")?;
    Ok(Item {
        id: ItemId::parse(&id).with_context(|| format!("stored item id '{id}' is malformed"))?,
        title: row.try_get("title")?,
        is_deleted: row.try_get("is_deleted")?,
        review_count: u32::try_from(review_count)
            .with_context(|| format!("item {id} has review count {review_count}"))?,
    })
}

fn review_from_row(row: &SqliteRow) -> Result<Review> {
    let id: String = row.try_get("id")?;
    let item_id: String = row.try_get("item_id")?;
    let rating: i64 = row.try_get("rating")?;
    Ok(Review {
        id: ReviewId::parse(&id)
            .with_context(|| format!("stored review id '{id}' is malformed"))?,
        item_id: ItemId::parse(&item_id)
            .with_context(|| format!("review {id} references malformed item id '{item_id}'"))?,
        reviewed_by: row.try_get("reviewed_by")?,
        text: row.try_get("text")?,
        rating: Rating::new(rating)
            .ok_or_else(|| anyhow!("review {id} has out of range rating {rating}"))?,
        reviewed_at: row.try_get::<DateTime<Utc>, _>("reviewed_at")?,
        is_deleted: row.try_get("is_deleted")?,
    })
}

#[async_trait]
impl ItemStore for Storage {
    async fn find_active_item(&self, id: &ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(
            "SELECT id, title, is_deleted, review_count FROM items WHERE id = ? AND is_deleted = 0",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_item(&self, id: &ItemId) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT id, title, is_deleted, review_count FROM items WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn increment_review_count(&self, id: &ItemId, delta: i64) -> Result<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        adjust_review_count(&mut conn, id, delta).await
    }
}

#[async_trait]
impl ReviewStore for Storage {
    async fn find_active_review(&self, id: &ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query(
            "SELECT id, item_id, reviewed_by, text, rating, reviewed_at, is_deleted
             FROM reviews
             WHERE id = ? AND is_deleted = 0",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn list_active_reviews(&self, item_id: &ItemId) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT id, item_id, reviewed_by, text, rating, reviewed_at, is_deleted
             FROM reviews
             WHERE item_id = ? AND is_deleted = 0
             ORDER BY reviewed_at ASC, id ASC",
        )
        .bind(item_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn create_review(&self, draft: &ReviewDraft) -> Result<Review> {
        let mut conn = self.pool.acquire().await?;
        insert_review(&mut conn, draft).await
    }

    async fn update_review_fields(
        &self,
        id: &ReviewId,
        fields: &ReviewFields,
    ) -> Result<Option<Review>> {
        let row = sqlx::query(
            "UPDATE reviews
             SET rating = COALESCE(?, rating),
                 text = COALESCE(?, text),
                 reviewed_by = COALESCE(?, reviewed_by)
             WHERE id = ? AND is_deleted = 0
             RETURNING id, item_id, reviewed_by, text, rating, reviewed_at, is_deleted",
        )
        .bind(fields.rating.map(i64::from))
        .bind(fields.text.as_deref())
        .bind(fields.reviewed_by.as_deref())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update review {id}"))?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn mark_review_deleted(&self, id: &ReviewId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE reviews SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to mark review {id} deleted"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReviewLedger for Storage {
    async fn record_review(&self, draft: &ReviewDraft) -> Result<Option<(Item, Review)>> {
        let mut tx = self.pool.begin().await?;

        let Some(item) = adjust_review_count(&mut tx, &draft.item_id, 1).await? else {
            return Ok(None);
        };
        let review = insert_review(&mut tx, draft).await?;

        tx.commit().await?;
        Ok(Some((item, review)))
    }

    async fn retire_review(&self, item_id: &ItemId, review_id: &ReviewId) -> Result<Option<Item>> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE reviews SET is_deleted = 1 WHERE id = ? AND item_id = ? AND is_deleted = 0",
        )
        .bind(review_id.as_str())
        .bind(item_id.as_str())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to mark review {review_id} deleted"))?
        .rows_affected();
        if marked == 0 {
            return Ok(None);
        }
        let Some(item) = adjust_review_count(&mut tx, item_id, -1).await? else {
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some(item))
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
