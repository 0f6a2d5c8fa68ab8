//! Application layer errors

use std::time::Duration;
use thiserror::Error;

/// Which cooldown axis refused an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownAxis {
    Global,
    User,
}

impl std::fmt::Display for CooldownAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CooldownAxis::Global => write!(f, "global cooldown"),
            CooldownAxis::User => write!(f, "per-user cooldown"),
        }
    }
}

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The handler turned the request down before doing any work; paid costs are refunded
    #[error("Refused: {0}")]
    Refused(String),

    #[error("Rate limited by {axis}, retry after {retry_after:?}")]
    RateLimited { axis: CooldownAxis, retry_after: Duration },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl BotError {
    /// Text shown to the invoking user, if this error is meant to be seen.
    ///
    /// `Unexpected`, storage and delivery failures stay in the logs.
    pub fn user_message(&self) -> Option<String> {
        match self {
            BotError::NotFound(msg)
            | BotError::PermissionDenied(msg)
            | BotError::InvalidInput(msg)
            | BotError::Refused(msg) => Some(msg.clone()),
            BotError::RateLimited { retry_after, .. } => Some(format!(
                "This command is on cooldown, try again in {} seconds.",
                retry_after.as_secs().max(1)
            )),
            BotError::UpstreamUnavailable(_) | BotError::Config(_) => {
                Some("Something went wrong, please try again later.".to_string())
            }
            BotError::Storage(_) | BotError::Delivery(_) | BotError::Unexpected(_) => None,
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        BotError::UpstreamUnavailable(e.to_string())
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
