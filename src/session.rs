//! Per-invocation state handed to every command.

use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::storage::{Database, DatabaseError, User};

/// Loaded configuration, where it came from, and the open database.
///
/// Built once in `main` and passed down explicitly; the logged-in user is
/// read from here rather than from any global.
pub struct Session {
    pub config: Config,
    pub config_path: PathBuf,
    pub db: Database,
}

/// Why no user could be resolved for a command that needs one.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not logged in; run `gator login <name>` first")]
    NotLoggedIn,

    #[error("current user {0:?} does not exist; run `gator register <name>`")]
    UnknownUser(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl Session {
    pub fn new(config: Config, config_path: PathBuf, db: Database) -> Self {
        Self {
            config,
            config_path,
            db,
        }
    }

    /// The user named by `current_user_name`, which must exist.
    pub async fn require_user(&self) -> Result<User, SessionError> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or(SessionError::NotLoggedIn)?;

        self.db
            .get_user_by_name(name)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(name.to_string()))
    }

    /// Record `name` as the logged-in user and persist it to the config file.
    pub fn set_current_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.config.current_user_name = Some(name.to_string());
        self.config.save(&self.config_path)
    }

    pub fn is_current_user(&self, name: &str) -> bool {
        self.config.current_user_name.as_deref() == Some(name)
    }
}
