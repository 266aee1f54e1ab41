//! CLI verbs and their handlers.
//!
//! [`dispatch`] resolves the logged-in user for the verbs that need one and
//! then hands off to the handler. Handlers write their results to the
//! given writer (stdout in `main`), diagnostics go through `tracing`.

mod agg;
mod browse;
mod feeds;
mod users;

use clap::Subcommand;
use std::io::Write;
use thiserror::Error;

use crate::config::ConfigError;
use crate::session::{Session, SessionError};
use crate::shutdown::Shutdown;
use crate::storage::DatabaseError;
use crate::util::{DurationError, UrlValidationError};

pub use agg::print_report;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("not logged in; run `gator login <name>` first")]
    NotLoggedIn,

    #[error("user {0:?} does not exist")]
    UnknownUser(String),

    #[error("user {0:?} already exists")]
    UserExists(String),

    #[error("a feed with URL {0} already exists")]
    FeedExists(String),

    #[error("no feed with URL {0}")]
    FeedNotFound(String),

    #[error("you are not following {0}")]
    NotFollowing(String),

    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),

    #[error("invalid interval: {0}")]
    InvalidInterval(#[from] DurationError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] DatabaseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<SessionError> for CommandError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotLoggedIn => CommandError::NotLoggedIn,
            SessionError::UnknownUser(name) => CommandError::UnknownUser(name),
            SessionError::Database(e) => CommandError::Storage(e),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },

    /// Switch to an existing user
    Login { name: String },

    /// Delete every user along with their follows
    Reset,

    /// List users, marking the current one
    Users,

    /// Add a feed, owned and followed by the current user
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },

    /// List every feed with the user that added it
    Feeds,

    /// Follow an existing feed by URL
    Follow { url: String },

    /// List the feeds the current user follows
    Following,

    /// Stop following a feed by URL
    Unfollow { url: String },

    /// Show the newest posts from followed feeds
    Browse {
        /// Number of posts (defaults to `browse_limit` from the config)
        limit: Option<u32>,
    },

    /// Fetch followed feeds, one per interval, until interrupted
    Agg {
        /// Time between fetches, e.g. 30s, 1m, 1h30m
        interval: String,
    },
}

impl Command {
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Command::AddFeed { .. }
                | Command::Follow { .. }
                | Command::Following
                | Command::Unfollow { .. }
                | Command::Browse { .. }
                | Command::Agg { .. }
        )
    }
}

/// Run one command against the session.
///
/// Verbs that need a user fail with [`CommandError::NotLoggedIn`] or
/// [`CommandError::UnknownUser`] before their handler is reached.
pub async fn dispatch<W: Write>(
    session: &mut Session,
    command: Command,
    shutdown: &Shutdown,
    out: &mut W,
) -> Result<(), CommandError> {
    let user = if command.requires_login() {
        Some(session.require_user().await?)
    } else {
        None
    };
    tracing::debug!(?command, user = ?user.as_ref().map(|u| &u.name), "Dispatching command");

    match (command, user) {
        (Command::Register { name }, _) => users::register(session, &name, out).await,
        (Command::Login { name }, _) => users::login(session, &name, out).await,
        (Command::Reset, _) => users::reset(session, out).await,
        (Command::Users, _) => users::list(session, out).await,
        (Command::Feeds, _) => feeds::list(session, out).await,
        (Command::AddFeed { name, url }, Some(user)) => {
            feeds::add(session, &user, &name, &url, out).await
        }
        (Command::Follow { url }, Some(user)) => feeds::follow(session, &user, &url, out).await,
        (Command::Following, Some(user)) => feeds::following(session, &user, out).await,
        (Command::Unfollow { url }, Some(user)) => {
            feeds::unfollow(session, &user, &url, out).await
        }
        (Command::Browse { limit }, Some(user)) => browse::run(session, &user, limit, out).await,
        (Command::Agg { interval }, Some(user)) => {
            agg::run(session, &user, &interval, shutdown, out).await
        }
        // requires_login() guarantees a user for every other verb
        (_, None) => Err(CommandError::NotLoggedIn),
    }
}

/// URL as stored by `addfeed`, so lookups match what was saved.
fn canonical_url(input: &str) -> String {
    let trimmed = input.trim();
    url::Url::parse(trimmed)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}
