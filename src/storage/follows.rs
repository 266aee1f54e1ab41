use chrono::Utc;

use super::schema::Database;
use super::types::{to_millis, DatabaseError, FeedFollowRecord, FeedFollowRow};

const FOLLOW_COLUMNS: &str = r#"
    SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at,
           u.name AS user_name, f.name AS feed_name, f.url AS feed_url
    FROM feed_follows ff
    JOIN users u ON u.id = ff.user_id
    JOIN feeds f ON f.id = ff.feed_id
"#;

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Follow a feed. Following twice is a no-op that returns the existing
    /// record.
    pub async fn create_feed_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<FeedFollowRecord, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, feed_id) DO NOTHING
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(to_millis(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let query = format!("{FOLLOW_COLUMNS} WHERE ff.user_id = ? AND ff.feed_id = ?");
        let row: FeedFollowRow = sqlx::query_as(&query)
            .bind(user_id)
            .bind(feed_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into_record())
    }

    /// Follows of `user_id`, in the order they were made.
    pub async fn get_follows_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FeedFollowRecord>, DatabaseError> {
        let query = format!("{FOLLOW_COLUMNS} WHERE ff.user_id = ? ORDER BY ff.created_at, ff.id");
        let rows: Vec<FeedFollowRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedFollowRow::into_record).collect())
    }

    /// Drop the follow between `user_id` and the feed at `url`.
    /// Returns the number of follows removed (0 or 1).
    pub async fn delete_feed_follow_by_url(
        &self,
        user_id: i64,
        url: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = ?
              AND feed_id IN (SELECT id FROM feeds WHERE url = ?)
        "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, DatabaseError};
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_follow_returns_joined_names() {
        let db = test_db().await;
        let user = db.create_user("kahya").await.unwrap();
        let feed = db
            .create_feed("Hacker News", "https://news.ycombinator.com/rss", None)
            .await
            .unwrap();

        let follow = db.create_feed_follow(user.id, feed.id).await.unwrap();
        assert_eq!(follow.user_name, "kahya");
        assert_eq!(follow.feed_name, "Hacker News");
        assert_eq!(follow.feed_url, "https://news.ycombinator.com/rss");
    }

    #[tokio::test]
    async fn test_follow_twice_is_idempotent() {
        let db = test_db().await;
        let user = db.create_user("kahya").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://blog.example.com/rss", None)
            .await
            .unwrap();

        let first = db.create_feed_follow(user.id, feed.id).await.unwrap();
        let second = db.create_feed_follow(user.id, feed.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_follows_for_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_missing_feed_fails() {
        let db = test_db().await;
        let user = db.create_user("kahya").await.unwrap();
        let err = db.create_feed_follow(user.id, 404).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Other(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_follows_are_per_user() {
        let db = test_db().await;
        let kahya = db.create_user("kahya").await.unwrap();
        let holgith = db.create_user("holgith").await.unwrap();
        let a = db
            .create_feed("A", "https://a.example.com/rss", None)
            .await
            .unwrap();
        let b = db
            .create_feed("B", "https://b.example.com/rss", None)
            .await
            .unwrap();

        db.create_feed_follow(kahya.id, a.id).await.unwrap();
        db.create_feed_follow(kahya.id, b.id).await.unwrap();
        db.create_feed_follow(holgith.id, b.id).await.unwrap();

        let names: Vec<String> = db
            .get_follows_for_user(kahya.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.feed_name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(db.get_follows_for_user(holgith.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unfollow_by_url() {
        let db = test_db().await;
        let kahya = db.create_user("kahya").await.unwrap();
        let holgith = db.create_user("holgith").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://blog.example.com/rss", None)
            .await
            .unwrap();
        db.create_feed_follow(kahya.id, feed.id).await.unwrap();
        db.create_feed_follow(holgith.id, feed.id).await.unwrap();

        let removed = db
            .delete_feed_follow_by_url(kahya.id, "https://blog.example.com/rss")
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(db.get_follows_for_user(kahya.id).await.unwrap().is_empty());
        // Other users keep their follow
        assert_eq!(db.get_follows_for_user(holgith.id).await.unwrap().len(), 1);

        let again = db
            .delete_feed_follow_by_url(kahya.id, "https://blog.example.com/rss")
            .await
            .unwrap();
        assert_eq!(again, 0);
    }
}
