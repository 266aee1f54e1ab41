//! SQLite persistence for users, feeds, follows and posts.
//!
//! All operations are methods on [`Database`], split by table into
//! submodules. Instants are stored as Unix milliseconds.

mod feeds;
mod follows;
mod posts;
mod schema;
mod types;
mod users;

pub use posts::PostWithFeed;
pub use schema::Database;
pub use types::{
    DatabaseError, Feed, FeedFollowRecord, FeedListing, NewPost, Post, UpsertOutcome, User,
};
