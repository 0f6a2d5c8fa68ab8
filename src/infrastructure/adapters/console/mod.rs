//! Console adapter for development/testing

use async_trait::async_trait;
use std::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{MessageKind, User};
use crate::domain::traits::{Bot, BotInfo};

/// A message the adapter sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Say(String),
    /// Recipient login and text
    Whisper(String, String),
    /// Message id and text
    Reply(String, String),
}

/// One line typed into the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    /// `login: text`, or `login: /me text` for an action
    Chat {
        login: String,
        text: String,
        kind: MessageKind,
    },
    /// `/whisper login text`
    Whisper { login: String, text: String },
    /// `:enable module_id`
    Enable(String),
    /// `:disable module_id`
    Disable(String),
    /// `:live [title]`
    Live(String),
    /// `:offline`
    Offline,
    /// `:modules`
    Modules,
    /// `:quit`
    Quit,
    Empty,
    Invalid(String),
}

impl ConsoleLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleLine::Empty;
        }

        if let Some(admin) = line.strip_prefix(':') {
            let (word, rest) = split_word(admin);
            return match word {
                "enable" if !rest.is_empty() => ConsoleLine::Enable(rest.to_string()),
                "disable" if !rest.is_empty() => ConsoleLine::Disable(rest.to_string()),
                "live" => ConsoleLine::Live(if rest.is_empty() { "Live".to_string() } else { rest.to_string() }),
                "offline" => ConsoleLine::Offline,
                "modules" => ConsoleLine::Modules,
                "quit" | "q" => ConsoleLine::Quit,
                _ => ConsoleLine::Invalid(format!("Unknown admin line :{}", admin)),
            };
        }

        if let Some(rest) = line.strip_prefix("/whisper ") {
            let (login, text) = split_word(rest);
            if login.is_empty() || text.is_empty() {
                return ConsoleLine::Invalid("Usage: /whisper login text".to_string());
            }
            return ConsoleLine::Whisper {
                login: login.to_lowercase(),
                text: text.to_string(),
            };
        }

        match line.split_once(':') {
            Some((login, text)) if !login.trim().is_empty() && !login.contains(' ') => {
                let text = text.trim();
                let (text, kind) = match text.strip_prefix("/me ") {
                    Some(action) => (action.trim(), MessageKind::Action),
                    None => (text, MessageKind::Chat),
                };
                ConsoleLine::Chat {
                    login: login.trim().to_lowercase(),
                    text: text.to_string(),
                    kind,
                }
            }
            _ => ConsoleLine::Invalid("Expected `login: text`".to_string()),
        }
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(' ') {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    echo: bool,
    sent: Mutex<Vec<Outbound>>,
}

impl ConsoleAdapter {
    pub fn new(channel: impl Into<String>) -> Self {
        let channel = channel.into();
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "chatmod-bot".to_string(),
                channel,
            },
            echo: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Adapter that only records what it sends
    pub fn recording(channel: impl Into<String>) -> Self {
        let mut adapter = Self::new(channel);
        adapter.echo = false;
        adapter
    }

    /// Everything sent so far, oldest first. Always empty for echoing adapters.
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn record(&self, outbound: Outbound) -> Result<(), BotError> {
        if self.echo {
            match &outbound {
                Outbound::Say(text) => println!("[#{}] {}", self.info.channel, text),
                Outbound::Whisper(to, text) => println!("[whisper -> {}] {}", to, text),
                Outbound::Reply(id, text) => println!("[reply {}] {}", id, text),
            }
            return Ok(());
        }
        self.sent
            .lock()
            .map_err(|_| BotError::Delivery("Lock poisoned".to_string()))?
            .push(outbound);
        Ok(())
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new("console")
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode) for #{}", self.info.channel);
        Ok(())
    }

    async fn say(&self, text: &str) -> Result<(), BotError> {
        self.record(Outbound::Say(text.to_string()))
    }

    async fn whisper(&self, user: &User, text: &str) -> Result<(), BotError> {
        self.record(Outbound::Whisper(user.login.clone(), text.to_string()))
    }

    async fn reply(&self, message_id: &str, text: &str) -> Result<(), BotError> {
        self.record(Outbound::Reply(message_id.to_string(), text.to_string()))
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
