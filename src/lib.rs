//! gator: a command-line RSS aggregator.
//!
//! Users register, add and follow feeds, and run `agg` to pull one feed per
//! interval into SQLite. `browse` shows the newest posts from followed
//! feeds.

pub mod commands;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod session;
pub mod shutdown;
pub mod storage;
pub mod util;
