use chrono::{DateTime, Utc};

/// Cached metadata for a requested video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongInfo {
    pub youtube_id: String,
    pub title: String,
    /// Length in seconds
    pub duration: u32,
}

/// A queued song request
#[derive(Debug, Clone)]
pub struct SongRequest {
    pub id: Option<i64>,
    pub stream_id: i64,
    pub youtube_id: String,
    pub user_id: String,
    pub date_added: DateTime<Utc>,
    pub date_played: Option<DateTime<Utc>>,
    /// Auto-skip after this many seconds when the song is too long
    pub skip_after: Option<u32>,
}

impl SongRequest {
    pub fn new(stream_id: i64, youtube_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            stream_id,
            youtube_id: youtube_id.into(),
            user_id: user_id.into(),
            date_added: Utc::now(),
            date_played: None,
            skip_after: None,
        }
    }
}
