use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::TimestampPolicy;
use crate::feed::{normalize_timestamp, FeedFetcher, FetchError, RawItem, TimestampError};
use crate::shutdown::Shutdown;
use crate::storage::{Database, DatabaseError, Feed, NewPost, UpsertOutcome, User};
use crate::util::decode_feed_text;

/// Why one ingestion cycle stopped early. Every variant is recoverable:
/// the scheduler logs it and waits for the next tick.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An item's `pubDate` matched no layout under [`TimestampPolicy::AbortFeed`].
    /// Items before it were stored.
    #[error("{url}: {source} (stored {stored_before} item(s) before it)")]
    Timestamp {
        url: String,
        stored_before: usize,
        #[source]
        source: TimestampError,
    },

    /// `url` is known once a feed has been selected.
    #[error("storage error: {source}")]
    Storage {
        url: Option<String>,
        #[source]
        source: DatabaseError,
    },
}

impl CycleError {
    fn storage(url: Option<&str>) -> impl FnOnce(DatabaseError) -> CycleError + '_ {
        move |source| CycleError::Storage {
            url: url.map(str::to_string),
            source,
        }
    }
}

impl CycleError {
    /// Feed the failure belongs to, when known.
    pub fn url(&self) -> Option<&str> {
        match self {
            CycleError::Fetch(e) => Some(e.url()),
            CycleError::Timestamp { url, .. } => Some(url),
            CycleError::Storage { url, .. } => url.as_deref(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CycleError::Fetch(FetchError::Cancelled { .. }))
    }
}

/// What one successful cycle did to one feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feed_name: String,
    pub feed_url: String,
    /// Channel title from the document, entity-decoded
    pub channel_title: String,
    /// Titles of newly stored posts, in document order
    pub saved: Vec<String>,
    pub already_stored: usize,
    /// Items dropped for a missing link or (under `skip_item`) a bad date
    pub skipped: usize,
    /// The feed was deleted while the cycle ran; remaining items were dropped
    pub feed_removed: bool,
}

/// Runs ingestion cycles for one process: one feed per call.
#[derive(Debug, Clone)]
pub struct Ingestor {
    db: Database,
    fetcher: FeedFetcher,
    policy: TimestampPolicy,
}

enum ItemOutcome {
    Stored(String),
    AlreadyStored,
    Skipped,
    FeedMissing,
}

enum PublishedAt {
    Known(DateTime<Utc>),
    /// No `pubDate` element, stored as NULL
    Missing,
    /// Rejected under [`TimestampPolicy::SkipItem`]
    Unparseable,
}

impl Ingestor {
    pub fn new(db: Database, fetcher: FeedFetcher, policy: TimestampPolicy) -> Self {
        Self {
            db,
            fetcher,
            policy,
        }
    }

    /// Ingest the feed that has waited longest among those `user` follows.
    ///
    /// The feed is stamped as fetched before the request goes out, so a
    /// failed fetch still moves it to the back of the rotation. Returns
    /// `Ok(None)` when the user follows nothing.
    pub async fn run_cycle(
        &self,
        user: &User,
        shutdown: &Shutdown,
    ) -> Result<Option<CycleReport>, CycleError> {
        let Some(feed) = self
            .db
            .select_next_feed_due(user.id)
            .await
            .map_err(CycleError::storage(None))?
        else {
            tracing::info!(user = %user.name, "No followed feeds to fetch");
            return Ok(None);
        };

        self.ingest_feed(&feed, shutdown).await.map(Some)
    }

    /// Stamp, fetch and store one already-selected feed.
    async fn ingest_feed(
        &self,
        feed: &Feed,
        shutdown: &Shutdown,
    ) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport {
            feed_name: feed.name.clone(),
            feed_url: feed.url.clone(),
            ..CycleReport::default()
        };

        let stamped = self
            .db
            .mark_feed_fetched(feed.id, Utc::now())
            .await
            .map_err(CycleError::storage(Some(&feed.url)))?;
        if !stamped {
            tracing::warn!(feed = %feed.url, "Feed deleted before it could be fetched");
            report.feed_removed = true;
            return Ok(report);
        }

        let document = self.fetcher.fetch(&feed.url, shutdown).await?;
        report.channel_title = decode_feed_text(&document.title);

        for item in &document.items {
            match self.ingest_item(feed, item, report.saved.len()).await? {
                ItemOutcome::Stored(title) => report.saved.push(title),
                ItemOutcome::AlreadyStored => report.already_stored += 1,
                ItemOutcome::Skipped => report.skipped += 1,
                ItemOutcome::FeedMissing => {
                    tracing::warn!(feed = %feed.url, "Feed deleted during ingestion, dropping remaining items");
                    report.feed_removed = true;
                    break;
                }
            }
        }

        tracing::info!(
            feed = %feed.url,
            saved = report.saved.len(),
            already_stored = report.already_stored,
            skipped = report.skipped,
            "Ingested feed"
        );
        Ok(report)
    }

    async fn ingest_item(
        &self,
        feed: &Feed,
        item: &RawItem,
        stored_so_far: usize,
    ) -> Result<ItemOutcome, CycleError> {
        let link = item.link.trim();
        if link.is_empty() {
            tracing::warn!(feed = %feed.url, title = %item.title, "Skipping item without a link");
            return Ok(ItemOutcome::Skipped);
        }

        let published_at = match self.published_at(&feed.url, item, stored_so_far)? {
            PublishedAt::Known(at) => Some(at),
            PublishedAt::Missing => None,
            PublishedAt::Unparseable => return Ok(ItemOutcome::Skipped),
        };

        let title = decode_feed_text(&item.title);
        let description = Some(decode_feed_text(&item.description)).filter(|d| !d.is_empty());

        let post = NewPost {
            feed_id: feed.id,
            title: title.clone(),
            url: link.to_string(),
            description,
            published_at,
        };

        let outcome = self
            .db
            .upsert_post(&post)
            .await
            .map_err(CycleError::storage(Some(&feed.url)))?;
        Ok(match outcome {
            UpsertOutcome::Inserted => ItemOutcome::Stored(title),
            UpsertOutcome::AlreadyStored => ItemOutcome::AlreadyStored,
            UpsertOutcome::FeedMissing => ItemOutcome::FeedMissing,
        })
    }

    /// Resolve an item's `pubDate`, applying the configured policy to
    /// dates no layout accepts.
    fn published_at(
        &self,
        url: &str,
        item: &RawItem,
        stored_so_far: usize,
    ) -> Result<PublishedAt, CycleError> {
        if item.pub_date.trim().is_empty() {
            return Ok(PublishedAt::Missing);
        }

        match normalize_timestamp(&item.pub_date) {
            Ok(at) => Ok(PublishedAt::Known(at.with_timezone(&Utc))),
            Err(source) => match self.policy {
                TimestampPolicy::AbortFeed => Err(CycleError::Timestamp {
                    url: url.to_string(),
                    stored_before: stored_so_far,
                    source,
                }),
                TimestampPolicy::SkipItem => {
                    tracing::warn!(feed = %url, link = %item.link, error = %source, "Skipping item with unparseable pubDate");
                    Ok(PublishedAt::Unparseable)
                }
            },
        }
    }
}
