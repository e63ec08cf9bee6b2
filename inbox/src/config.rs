use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{InboxError, Result};
use crate::models::UserId;

const DEFAULT_DB_PATH: &str = "haven-inbox.db";
const DEFAULT_POLL_SECS: u64 = 30;

pub const ENV_DB_PATH: &str = "HAVEN_INBOX_DB";
pub const ENV_POLL_SECS: &str = "HAVEN_INBOX_POLL_SECS";
pub const ENV_USER: &str = "HAVEN_INBOX_USER";

/// Runtime settings for the inbox
#[derive(Debug, Clone, PartialEq)]
pub struct InboxConfig {
    pub database_path: PathBuf,
    /// Background refresh period
    pub poll_interval: Duration,
    pub user: Option<UserId>,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            user: None,
        }
    }
}

impl InboxConfig {
    /// Load from the process environment, after reading `.env` if present
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "Loaded environment file"),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(InboxError::Config(e.to_string())),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path.trim());
        }

        if let Some(raw) = lookup(ENV_POLL_SECS) {
            config.poll_interval = parse_poll_secs(&raw)?;
        }

        if let Some(raw) = lookup(ENV_USER).filter(|u| !u.trim().is_empty()) {
            let user = UserId::parse(&raw)
                .map_err(|e| InboxError::Config(format!("{}: {}", ENV_USER, e)))?;
            config.user = Some(user);
        }

        Ok(config)
    }
}

/// Parse a polling period in whole seconds; zero is rejected
pub fn parse_poll_secs(raw: &str) -> Result<Duration> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        InboxError::Config(format!("{} must be a whole number of seconds, got {:?}", ENV_POLL_SECS, raw))
    })?;
    if secs == 0 {
        return Err(InboxError::Config(format!("{} must be greater than 0", ENV_POLL_SECS)));
    }
    Ok(Duration::from_secs(secs))
}
