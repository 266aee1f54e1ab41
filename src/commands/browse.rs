use std::io::Write;

use super::CommandError;
use crate::session::Session;
use crate::storage::User;
use crate::util::strip_terminal_escapes;

/// Print the newest posts across the user's follows.
pub(super) async fn run<W: Write>(
    session: &mut Session,
    user: &User,
    limit: Option<u32>,
    out: &mut W,
) -> Result<(), CommandError> {
    let limit = limit.unwrap_or(session.config.browse_limit);
    let posts = session.db.get_posts_for_user(user.id, limit).await?;
    tracing::debug!(user = %user.name, limit, found = posts.len(), "Browsing posts");

    for entry in posts {
        let post = entry.post;
        writeln!(out, "Title:{}", strip_terminal_escapes(&post.title))?;
        writeln!(
            out,
            "Description: {}",
            strip_terminal_escapes(post.description.as_deref().unwrap_or(""))
        )?;
        writeln!(out, "URL: {}", strip_terminal_escapes(&post.url))?;
        if let Some(published) = post.published_at {
            writeln!(
                out,
                "Published: {} ({})",
                published.format("%Y-%m-%d %H:%M UTC"),
                strip_terminal_escapes(&entry.feed_name)
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cleanup, session};
    use super::*;
    use crate::storage::NewPost;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_browse_prints_newest_first() {
        let mut s = session("browse").await;
        let user = s.db.create_user("kahya").await.unwrap();
        let feed = s
            .db
            .create_feed("Blog", "https://blog.example.com/rss", Some(user.id))
            .await
            .unwrap();
        s.db.create_feed_follow(user.id, feed.id).await.unwrap();

        for (n, day) in [(1, 1), (2, 2), (3, 3)] {
            s.db.upsert_post(&NewPost {
                feed_id: feed.id,
                title: format!("Post {}", n),
                url: format!("https://blog.example.com/{}", n),
                description: (n != 3).then(|| format!("Body {}", n)),
                published_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
            })
            .await
            .unwrap();
        }

        let mut out = Vec::new();
        run(&mut s, &user, None, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Title:Post 3\n\
             Description: \n\
             URL: https://blog.example.com/3\n\
             Published: 2024-01-03 00:00 UTC (Blog)\n\
             Title:Post 2\n\
             Description: Body 2\n\
             URL: https://blog.example.com/2\n\
             Published: 2024-01-02 00:00 UTC (Blog)\n"
        );

        let mut out = Vec::new();
        run(&mut s, &user, Some(10), &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap().matches("Title:").count(),
            3
        );
        cleanup(&s);
    }
}
