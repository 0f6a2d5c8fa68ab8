//! Bot handles shared by every command, and the per-invocation context

use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::executor::ActionQueue;
use crate::application::reply::{MessageAction, ReplyChannel};
use crate::domain::entities::{Message, User};
use crate::domain::traits::{PlatformApi, SongInfoProvider, Store};

/// Everything a command may touch while it runs
pub struct BotContext {
    /// The channel owner
    pub streamer: User,
    pub store: Arc<dyn Store>,
    pub platform: Arc<dyn PlatformApi>,
    pub replies: ReplyChannel,
    pub actions: ActionQueue,
    pub songs: Option<Arc<dyn SongInfoProvider>>,
    pub trigger: char,
}

impl BotContext {
    pub fn new(
        streamer: User,
        store: Arc<dyn Store>,
        platform: Arc<dyn PlatformApi>,
        replies: ReplyChannel,
        actions: ActionQueue,
    ) -> Self {
        Self {
            streamer,
            store,
            platform,
            replies,
            actions,
            songs: None,
            trigger: '!',
        }
    }

    pub fn with_song_provider(mut self, provider: Arc<dyn SongInfoProvider>) -> Self {
        self.songs = Some(provider);
        self
    }

    pub fn with_trigger(mut self, trigger: char) -> Self {
        self.trigger = trigger;
        self
    }

    /// The channel counts as live while a stream row is open
    pub async fn is_online(&self) -> Result<bool, BotError> {
        Ok(self.store.current_stream_id().await?.is_some())
    }
}

/// Input handed to a command handler
#[derive(Clone)]
pub struct CommandContext {
    pub bot: Arc<BotContext>,
    pub source: User,
    /// Text after the command name
    pub message: String,
    pub event: Message,
    /// Delivery method resolved for this invocation
    pub method: MessageAction,
    /// Name the command was registered under
    pub command: String,
}

impl CommandContext {
    /// Answer the invoking user through the resolved delivery method
    pub async fn respond(&self, text: &str) -> Result<(), BotError> {
        self.respond_with(text, self.method).await
    }

    pub async fn respond_with(&self, text: &str, method: MessageAction) -> Result<(), BotError> {
        self.bot
            .replies
            .deliver(&self.source, text, &self.event, method)
            .await
    }

    /// Arguments split on single spaces, empty segments dropped
    pub fn args(&self) -> Vec<&str> {
        self.message.split(' ').filter(|s| !s.is_empty()).collect()
    }
}
