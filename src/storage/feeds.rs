use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{to_millis, DatabaseError, Feed, FeedListing, FeedRow};

/// Row type for the feed listing (feed columns + owner name)
#[derive(Debug, sqlx::FromRow)]
struct FeedListingRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    owner_name: Option<String>,
}

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a new feed. Fails with [`DatabaseError::Duplicate`] if the URL
    /// is already known.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        owner: Option<i64>,
    ) -> Result<Feed, DatabaseError> {
        let row: FeedRow = sqlx::query_as(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, url, user_id, created_at, last_fetched_at
        "#,
        )
        .bind(name)
        .bind(url)
        .bind(owner)
        .bind(to_millis(Utc::now()))
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.into_feed())
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let row: Option<FeedRow> = sqlx::query_as(
            "SELECT id, name, url, user_id, created_at, last_fetched_at FROM feeds WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FeedRow::into_feed))
    }

    /// All feeds with their owner's name, oldest first.
    pub async fn list_feeds(&self) -> Result<Vec<FeedListing>, DatabaseError> {
        let rows: Vec<FeedListingRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.last_fetched_at,
                   u.name AS owner_name
            FROM feeds f
            LEFT JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at, f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedListing {
                feed: row.feed.into_feed(),
                owner_name: row.owner_name,
            })
            .collect())
    }

    /// The followed feed that has waited longest for a fetch.
    ///
    /// Only feeds `user_id` follows are considered. Never-fetched feeds come
    /// first, then oldest `last_fetched_at`; ties go to the lower feed id.
    /// Returns `None` when the user follows nothing.
    pub async fn select_next_feed_due(&self, user_id: i64) -> Result<Option<Feed>, DatabaseError> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.last_fetched_at
            FROM feeds f
            JOIN feed_follows ff ON ff.feed_id = f.id
            WHERE ff.user_id = ?
            ORDER BY f.last_fetched_at ASC NULLS FIRST, f.id ASC
            LIMIT 1
        "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FeedRow::into_feed))
    }

    /// Stamp the rotation cursor. Returns `false` if the feed no longer exists.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE feeds SET last_fetched_at = ? WHERE id = ?")
            .bind(to_millis(at))
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a feed with its follows and posts.
    #[cfg(test)]
    pub(crate) async fn delete_feed(&self, feed_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
