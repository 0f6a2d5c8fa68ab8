use async_trait::async_trait;
use crate::domain::entities::User;
use crate::application::errors::BotError;

/// Bot trait - abstraction for the chat transport
///
/// Every method sends exactly one outbound message and reports failures
/// to the caller.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Start the transport
    async fn start(&self) -> Result<(), BotError>;

    /// Send a public message to the channel
    async fn say(&self, text: &str) -> Result<(), BotError>;

    /// Send a private message to a user
    async fn whisper(&self, user: &User, text: &str) -> Result<(), BotError>;

    /// Reply in-thread to a previously received message
    async fn reply(&self, message_id: &str, text: &str) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub channel: String,
}
