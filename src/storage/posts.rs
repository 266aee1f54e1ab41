use chrono::Utc;

use super::schema::Database;
use super::types::{to_millis, DatabaseError, NewPost, Post, PostRow, UpsertOutcome};

/// Post joined with the name of its feed, for `browse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithFeed {
    pub post: Post,
    pub feed_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PostWithFeedRow {
    #[sqlx(flatten)]
    post: PostRow,
    feed_name: String,
}

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Store a post unless one with the same URL already exists.
    ///
    /// The feed check and the insert share a transaction, so a feed deleted
    /// between selection and persistence is reported as
    /// [`UpsertOutcome::FeedMissing`] instead of a foreign key error.
    /// Existing rows are never modified.
    pub async fn upsert_post(&self, post: &NewPost) -> Result<UpsertOutcome, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let feed_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM feeds WHERE id = ?")
            .bind(post.feed_id)
            .fetch_optional(&mut *tx)
            .await?;
        if feed_exists.is_none() {
            return Ok(UpsertOutcome::FeedMissing);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
        "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at.map(to_millis))
        .bind(to_millis(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await?;

        Ok(if result.rows_affected() > 0 {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::AlreadyStored
        })
    }

    /// Newest posts across the feeds `user_id` follows.
    ///
    /// Posts without a publication time sort last.
    pub async fn get_posts_for_user(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<PostWithFeed>, DatabaseError> {
        let rows: Vec<PostWithFeedRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC NULLS LAST, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithFeed {
                post: row.post.into_post(),
                feed_name: row.feed_name,
            })
            .collect())
    }

    /// Every post of one feed, newest first.
    pub async fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC NULLS LAST, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PostRow::into_post).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, Feed, NewPost, UpsertOutcome};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    async fn test_feed(db: &Database, n: u32) -> Feed {
        db.create_feed(
            &format!("Feed {}", n),
            &format!("https://feed{}.example.com/rss", n),
            None,
        )
        .await
        .unwrap()
    }

    fn new_post(feed_id: i64, url: &str, year: i32) -> NewPost {
        NewPost {
            feed_id,
            title: format!("Post at {}", url),
            url: url.to_string(),
            description: Some("body".to_string()),
            published_at: Some(Utc.with_ymd_and_hms(year, 1, 2, 3, 4, 5).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_skips() {
        let db = test_db().await;
        let feed = test_feed(&db, 1).await;
        let post = new_post(feed.id, "https://a.example.com/1", 2024);

        assert_eq!(db.upsert_post(&post).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(
            db.upsert_post(&post).await.unwrap(),
            UpsertOutcome::AlreadyStored
        );

        let stored = db.get_posts_for_feed(feed.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, post.title);
        assert_eq!(stored[0].published_at, post.published_at);
    }

    #[tokio::test]
    async fn test_upsert_never_overwrites() {
        let db = test_db().await;
        let feed = test_feed(&db, 1).await;
        let original = new_post(feed.id, "https://a.example.com/1", 2024);
        db.upsert_post(&original).await.unwrap();

        let mut edited = original.clone();
        edited.title = "Edited".to_string();
        edited.description = None;
        assert_eq!(
            db.upsert_post(&edited).await.unwrap(),
            UpsertOutcome::AlreadyStored
        );

        let stored = db.get_posts_for_feed(feed.id).await.unwrap();
        assert_eq!(stored[0].title, original.title);
        assert_eq!(stored[0].description.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn test_url_unique_across_feeds() {
        let db = test_db().await;
        let a = test_feed(&db, 1).await;
        let b = test_feed(&db, 2).await;

        let url = "https://shared.example.com/story";
        db.upsert_post(&new_post(a.id, url, 2024)).await.unwrap();
        assert_eq!(
            db.upsert_post(&new_post(b.id, url, 2024)).await.unwrap(),
            UpsertOutcome::AlreadyStored
        );
        assert!(db.get_posts_for_feed(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_for_deleted_feed() {
        let db = test_db().await;
        let feed = test_feed(&db, 1).await;
        db.delete_feed(feed.id).await.unwrap();

        let outcome = db
            .upsert_post(&new_post(feed.id, "https://a.example.com/1", 2024))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::FeedMissing);
    }

    #[tokio::test]
    async fn test_posts_for_user_newest_first_with_limit() {
        let db = test_db().await;
        let user = db.create_user("kahya").await.unwrap();
        let followed = test_feed(&db, 1).await;
        let other = test_feed(&db, 2).await;
        db.create_feed_follow(user.id, followed.id).await.unwrap();

        db.upsert_post(&new_post(followed.id, "https://a.example.com/old", 2019))
            .await
            .unwrap();
        db.upsert_post(&new_post(followed.id, "https://a.example.com/new", 2024))
            .await
            .unwrap();
        let mut undated = new_post(followed.id, "https://a.example.com/undated", 2000);
        undated.published_at = None;
        db.upsert_post(&undated).await.unwrap();
        db.upsert_post(&new_post(other.id, "https://b.example.com/x", 2025))
            .await
            .unwrap();

        let urls: Vec<String> = db
            .get_posts_for_user(user.id, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.post.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://a.example.com/new",
                "https://a.example.com/old",
                "https://a.example.com/undated",
            ]
        );

        let limited = db.get_posts_for_user(user.id, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].feed_name, "Feed 1");
    }
}
