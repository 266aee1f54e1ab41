use std::io::Write;

use super::{canonical_url, CommandError};
use crate::session::Session;
use crate::storage::{DatabaseError, User};
use crate::util::validate_feed_url;

/// `addfeed`: register a feed owned by `user` and follow it.
pub(super) async fn add<W: Write>(
    session: &mut Session,
    user: &User,
    name: &str,
    url: &str,
    out: &mut W,
) -> Result<(), CommandError> {
    let url = validate_feed_url(url, session.config.allow_private_urls)?;

    let feed = match session.db.create_feed(name, url.as_str(), Some(user.id)).await {
        Ok(feed) => feed,
        Err(DatabaseError::Duplicate(_)) => return Err(CommandError::FeedExists(url.to_string())),
        Err(e) => return Err(e.into()),
    };
    session.db.create_feed_follow(user.id, feed.id).await?;

    tracing::info!(feed = %feed.url, id = feed.id, user = %user.name, "Added feed");
    writeln!(out, "Feed {} added", feed.name)?;
    writeln!(out, "   - URL  : {}", feed.url)?;
    writeln!(out, "   - ID   : {}", feed.id)?;
    writeln!(out, "   - Owner: {}", user.name)?;
    Ok(())
}

/// `feeds`: every feed with the name of the user who added it.
pub(super) async fn list<W: Write>(session: &mut Session, out: &mut W) -> Result<(), CommandError> {
    writeln!(out, "FEED LIST")?;
    for (i, listing) in session.db.list_feeds().await?.iter().enumerate() {
        writeln!(out, "{}. - Feed Name : {}", i + 1, listing.feed.name)?;
        writeln!(out, "   - URL       : {}", listing.feed.url)?;
        writeln!(
            out,
            "   - User Name : {}",
            listing.owner_name.as_deref().unwrap_or("(none)")
        )?;
    }
    Ok(())
}

pub(super) async fn follow<W: Write>(
    session: &mut Session,
    user: &User,
    url: &str,
    out: &mut W,
) -> Result<(), CommandError> {
    let url = canonical_url(url);
    let feed = session
        .db
        .get_feed_by_url(&url)
        .await?
        .ok_or(CommandError::FeedNotFound(url))?;

    let follow = session.db.create_feed_follow(user.id, feed.id).await?;
    writeln!(out, "Feed name: {}", follow.feed_name)?;
    writeln!(out, "User: {}", follow.user_name)?;
    Ok(())
}

pub(super) async fn following<W: Write>(
    session: &mut Session,
    user: &User,
    out: &mut W,
) -> Result<(), CommandError> {
    for follow in session.db.get_follows_for_user(user.id).await? {
        writeln!(out, "{}", follow.feed_name)?;
    }
    Ok(())
}

pub(super) async fn unfollow<W: Write>(
    session: &mut Session,
    user: &User,
    url: &str,
    out: &mut W,
) -> Result<(), CommandError> {
    let url = canonical_url(url);
    if session.db.delete_feed_follow_by_url(user.id, &url).await? == 0 {
        return Err(CommandError::NotFollowing(url));
    }
    writeln!(out, "Unfollowed {}", url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cleanup, session};
    use super::*;
    use pretty_assertions::assert_eq;

    async fn logged_in(name: &str) -> (Session, User) {
        let s = session(name).await;
        let user = s.db.create_user("kahya").await.unwrap();
        (s, user)
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_addfeed_follows_automatically() {
        let (mut s, user) = logged_in("addfeed").await;
        add(&mut s, &user, "HN", "https://news.ycombinator.com/rss", &mut Vec::new())
            .await
            .unwrap();

        let mut out = Vec::new();
        following(&mut s, &user, &mut out).await.unwrap();
        assert_eq!(text(out), "HN\n");
        cleanup(&s);
    }

    #[tokio::test]
    async fn test_addfeed_rejects_bad_url() {
        let (mut s, user) = logged_in("addfeed_bad").await;
        let err = add(&mut s, &user, "Local", "file:///etc/passwd", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidUrl(_)));

        s.config.allow_private_urls = false;
        let err = add(&mut s, &user, "Local", "http://127.0.0.1/rss", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidUrl(_)));
        cleanup(&s);
    }

    #[tokio::test]
    async fn test_addfeed_duplicate() {
        let (mut s, user) = logged_in("addfeed_dup").await;
        add(&mut s, &user, "A", "https://a.example.com/rss", &mut Vec::new())
            .await
            .unwrap();
        let err = add(&mut s, &user, "B", "https://a.example.com/rss", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::FeedExists(_)));
        cleanup(&s);
    }

    #[tokio::test]
    async fn test_feeds_listing() {
        let (mut s, user) = logged_in("feeds_list").await;
        add(&mut s, &user, "Blog", "https://blog.example.com/rss", &mut Vec::new())
            .await
            .unwrap();

        let mut out = Vec::new();
        list(&mut s, &mut out).await.unwrap();
        assert_eq!(
            text(out),
            "FEED LIST\n\
             1. - Feed Name : Blog\n   \
             - URL       : https://blog.example.com/rss\n   \
             - User Name : kahya\n"
        );
        cleanup(&s);
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let (mut s, owner) = logged_in("follow").await;
        add(&mut s, &owner, "Blog", "https://blog.example.com/rss", &mut Vec::new())
            .await
            .unwrap();
        let reader = s.db.create_user("holgith").await.unwrap();

        let mut out = Vec::new();
        follow(&mut s, &reader, "https://blog.example.com/rss", &mut out)
            .await
            .unwrap();
        assert_eq!(text(out), "Feed name: Blog\nUser: holgith\n");

        unfollow(&mut s, &reader, "https://blog.example.com/rss", &mut Vec::new())
            .await
            .unwrap();
        let err = unfollow(&mut s, &reader, "https://blog.example.com/rss", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotFollowing(_)));
        cleanup(&s);
    }

    #[tokio::test]
    async fn test_follow_unknown_feed() {
        let (mut s, user) = logged_in("follow_unknown").await;
        let err = follow(&mut s, &user, "https://nowhere.example.com/rss", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::FeedNotFound(_)));
        cleanup(&s);
    }
}
