//! Feed retrieval and decoding.
//!
//! - [`parser`] - RSS 2.0 XML into [`RawFeedDocument`]
//! - [`fetcher`] - HTTP GET with user agent, timeout, size limit and cancellation
//! - [`timestamp`] - `pubDate` strings into instants via an ordered layout list
//!
//! Nothing here touches storage; [`crate::ingest`] combines these pieces
//! with the database.

mod fetcher;
mod parser;
mod timestamp;

pub use fetcher::{
    FeedFetcher, FetchError, FetchSettings, DEFAULT_MAX_FEED_BYTES, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT,
};
pub use parser::{parse_feed, ParseError, RawFeedDocument, RawItem};
pub use timestamp::{normalize_timestamp, TimestampError};
