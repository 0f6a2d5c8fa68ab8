use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::errors::BotError;
use crate::domain::entities::{SongInfo, User};

/// Result of asking the platform for a commercial break
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommercialOutcome {
    pub message: String,
    pub success: bool,
}

/// Streaming platform API
///
/// Implementations own their access tokens. An unauthorized response is
/// reported as [`BotError::PermissionDenied`].
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, BotError>;

    /// `None` when `user_id` does not follow `broadcaster_id`
    async fn get_follow_since(
        &self,
        broadcaster_id: &str,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, BotError>;

    async fn start_commercial(
        &self,
        broadcaster_id: &str,
        length: u32,
    ) -> Result<CommercialOutcome, BotError>;
}

/// Source of video metadata for song requests
#[async_trait]
pub trait SongInfoProvider: Send + Sync {
    /// `None` when the id is not a playable video
    async fn fetch(&self, youtube_id: &str) -> Result<Option<SongInfo>, BotError>;
}
