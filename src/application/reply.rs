//! Reply channel - delivers responses back to the invoking user

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::entities::{Message, MessageKind, User};
use crate::domain::traits::Bot;

/// How a response reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAction {
    /// Public chat message addressed to the user
    #[default]
    Say,
    /// Private message
    Whisper,
    /// Threaded reply to the originating message
    Reply,
}

impl std::str::FromStr for MessageAction {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "say" => Ok(MessageAction::Say),
            "whisper" => Ok(MessageAction::Whisper),
            "reply" => Ok(MessageAction::Reply),
            other => Err(BotError::InvalidInput(format!("Unknown message action '{}'", other))),
        }
    }
}

/// Sends exactly one message per delivery through the chat transport
#[derive(Clone)]
pub struct ReplyChannel {
    transport: Arc<dyn Bot>,
}

impl ReplyChannel {
    pub fn new(transport: Arc<dyn Bot>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Bot> {
        &self.transport
    }

    pub async fn deliver(
        &self,
        user: &User,
        text: &str,
        event: &Message,
        method: MessageAction,
    ) -> Result<(), BotError> {
        match method {
            MessageAction::Say => {
                let text = format!("{}, {}", user, lowercase_first(text));
                self.transport.say(&text).await
            }
            MessageAction::Whisper => self.transport.whisper(user, text).await,
            MessageAction::Reply => match event.kind {
                MessageKind::Chat | MessageKind::Action => self.transport.reply(&event.id, text).await,
                MessageKind::Whisper => self.transport.whisper(user, text).await,
            },
        }
    }

    /// Public channel message not addressed to anyone
    pub async fn say(&self, text: &str) -> Result<(), BotError> {
        self.transport.say(text).await
    }

    pub async fn whisper(&self, user: &User, text: &str) -> Result<(), BotError> {
        self.transport.whisper(user, text).await
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
