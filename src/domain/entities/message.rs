use super::User;
use chrono::{DateTime, Utc};

/// How a message reached the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Action,
    Whisper,
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::Action => "action",
            MessageKind::Whisper => "whisper",
        }
    }
}

/// Represents an incoming chat event
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub channel: String,
    pub sender: User,
    pub text: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(channel: impl Into<String>, sender: User, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.into(),
            sender,
            text: text.into(),
            kind: MessageKind::Chat,
            timestamp: Utc::now(),
        }
    }

    pub fn whisper(sender: User, text: impl Into<String>) -> Self {
        let mut msg = Self::new("", sender, text);
        msg.kind = MessageKind::Whisper;
        msg
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_whisper(&self) -> bool {
        self.kind == MessageKind::Whisper
    }
}
