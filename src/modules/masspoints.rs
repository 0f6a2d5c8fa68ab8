//! Give points to everyone recently active in chat

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::context::CommandContext;
use crate::application::errors::{BotError, ConfigError};
use crate::application::services::parse_points_amount;
use crate::domain::entities::command::normalize_name;
use crate::domain::entities::{Command, CommandExample, CommandHandler};
use crate::modules::settings::{check_len, check_range};
use crate::modules::trait_def::Module;

pub const ID: &str = "masspoints";

const COMMAND_LEVEL: u32 = 1000;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MassPointsSettings {
    pub command_name: String,
    pub last_active_minutes: u32,
}

impl Default for MassPointsSettings {
    fn default() -> Self {
        Self {
            command_name: "masspoints".to_string(),
            last_active_minutes: 10,
        }
    }
}

impl MassPointsSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_len("command_name", &self.command_name, 2, 25)?;
        check_range("last_active_minutes", self.last_active_minutes, 0, 1440)?;
        Ok(())
    }
}

struct MassPointsCommand {
    usage_name: String,
    last_active_minutes: u32,
}

#[async_trait]
impl CommandHandler for MassPointsCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<(), BotError> {
        let Some(input) = ctx.args().first().map(|s| s.to_string()) else {
            return Ok(());
        };

        // Relative amounts need the stored balance, not the one on the event
        let source = ctx
            .bot
            .store
            .get_user(&ctx.source.id)
            .await?
            .unwrap_or_else(|| ctx.source.clone());

        let points = match parse_points_amount(&source, &input) {
            Ok(points) => points,
            Err(BotError::InvalidInput(reason)) => {
                let text = format!("{}. Usage: {}{} POINTS", reason, ctx.bot.trigger, self.usage_name);
                return ctx.bot.replies.whisper(&ctx.source, &text).await;
            }
            Err(e) => return Err(e),
        };

        let since = Utc::now() - ChronoDuration::minutes(i64::from(self.last_active_minutes));
        let users = ctx.bot.store.add_points_to_active(points, since).await?;
        info!("{} gave {} points to {} users", ctx.source.login, points, users);

        let text = format!("Successfully gave away {} points to {} users FeelsGoodMan", points, users);
        ctx.bot.replies.say(&text).await
    }
}

pub struct MassPointsModule {
    settings: MassPointsSettings,
}

impl MassPointsModule {
    pub fn new(settings: MassPointsSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Module for MassPointsModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Mass Points"
    }

    fn description(&self) -> &str {
        "Allows staff to give points to everyone"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()
    }

    fn commands(&self) -> Vec<Command> {
        let name = normalize_name(&self.settings.command_name, '!');
        let handler = MassPointsCommand {
            usage_name: name.clone(),
            last_active_minutes: self.settings.last_active_minutes,
        };

        vec![Command::new(&name, handler)
            .with_description("Give points to every active chatter")
            .with_level(COMMAND_LEVEL)
            .deferred()
            .with_example(CommandExample::new(
                "Give points to everyone.",
                &format!("user:!{} 4444\nbot: Successfully gave away 4444 points to 2 users FeelsGoodMan", name),
                "",
            ))]
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert(
            "last_active_minutes".to_string(),
            self.settings.last_active_minutes.to_string(),
        );
        meta
    }
}
