use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::errors::StorageError;
use crate::domain::entities::{SongInfo, SongRequest, User};

/// Store trait - abstraction for data persistence
///
/// Each method is one logical operation with its own transaction scope.
#[async_trait]
pub trait Store: Send + Sync {
    // User operations
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError>;
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StorageError>;
    async fn save_user(&self, user: &User) -> Result<(), StorageError>;
    /// Insert the user if unknown and mark them active at `now`
    async fn touch_user(&self, user: &User, now: DateTime<Utc>) -> Result<(), StorageError>;

    // Points
    /// Add `amount` points to every user active since `since`, returning the row count
    async fn add_points_to_active(&self, amount: i64, since: DateTime<Utc>) -> Result<u64, StorageError>;
    /// Deduct `cost` points if the user can afford it
    async fn charge_points(&self, user_id: &str, cost: i64) -> Result<bool, StorageError>;
    /// Give back points taken by `charge_points`
    async fn refund_points(&self, user_id: &str, amount: i64) -> Result<(), StorageError>;

    // Streams
    async fn current_stream_id(&self) -> Result<Option<i64>, StorageError>;
    async fn start_stream(&self, title: &str) -> Result<i64, StorageError>;
    async fn end_stream(&self) -> Result<bool, StorageError>;

    // Song queue
    async fn find_song_info(&self, youtube_id: &str) -> Result<Option<SongInfo>, StorageError>;
    async fn save_song_info(&self, info: &SongInfo) -> Result<(), StorageError>;
    async fn count_unplayed_songs(&self, stream_id: i64, user_id: &str) -> Result<u32, StorageError>;
    async fn add_song_request(&self, request: &SongRequest) -> Result<i64, StorageError>;
}
