//! Follow-age lookups: `!followage` and `!followsince`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::context::CommandContext;
use crate::application::errors::{BotError, ConfigError};
use crate::application::reply::MessageAction;
use crate::application::services::{find_or_create_from_input, format_date, time_since};
use crate::domain::entities::{Command, CommandExample, CommandHandler};
use crate::modules::settings::check_range;
use crate::modules::trait_def::Module;

pub const ID: &str = "followage";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FollowAgeSettings {
    pub action_followage: MessageAction,
    pub action_followsince: MessageAction,
    /// Seconds
    pub global_cd: u64,
    /// Seconds
    pub user_cd: u64,
}

impl Default for FollowAgeSettings {
    fn default() -> Self {
        Self {
            action_followage: MessageAction::Say,
            action_followsince: MessageAction::Say,
            global_cd: 4,
            user_cd: 8,
        }
    }
}

impl FollowAgeSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("global_cd", self.global_cd, 0, 120)?;
        check_range("user_cd", self.user_cd, 0, 240)?;
        Ok(())
    }
}

/// How the follow date is phrased
#[derive(Debug, Clone, Copy)]
enum Phrasing {
    /// `for 4 months and 24 days`
    Age,
    /// `since 04 March 2015, 07:02:01 UTC`
    Since,
}

impl Phrasing {
    fn describe(self, follow_since: DateTime<Utc>) -> String {
        match self {
            Phrasing::Age => format!("for {}", time_since(follow_since, Utc::now())),
            Phrasing::Since => format!("since {}", format_date(follow_since)),
        }
    }
}

struct FollowCommand {
    phrasing: Phrasing,
    method: MessageAction,
}

#[async_trait]
impl CommandHandler for FollowCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<(), BotError> {
        let args = ctx.args();
        let user_input = args.first().copied();
        let broadcaster_input = args
            .get(1)
            .map(|s| s.to_string())
            .unwrap_or_else(|| ctx.bot.streamer.login.clone());

        let store = ctx.bot.store.as_ref();
        let platform = ctx.bot.platform.as_ref();

        let user = match user_input {
            Some(input) => match find_or_create_from_input(store, platform, input).await? {
                Some(user) => user,
                None => {
                    let text = format!("User \"{}\" could not be found", input);
                    return ctx.respond_with(&text, self.method).await;
                }
            },
            None => ctx.source.clone(),
        };

        let Some(broadcaster) = find_or_create_from_input(store, platform, &broadcaster_input).await? else {
            let text = format!("User \"{}\" could not be found", broadcaster_input);
            return ctx.respond_with(&text, self.method).await;
        };

        let follow_since = match platform.get_follow_since(&broadcaster.id, &user.id).await {
            Ok(since) => since,
            Err(BotError::PermissionDenied(reason)) => {
                info!("Failed to fetch follow since: {}", reason);
                let text = format!(
                    "Bot does not have permission to check follow age for streamer {}",
                    broadcaster_input
                );
                return ctx.respond_with(&text, self.method).await;
            }
            Err(e) => return Err(e),
        };

        let is_self = ctx.source.same_as(&user);
        let text = match follow_since {
            Some(since) => {
                let suffix = format!("been following {} {}", broadcaster, self.phrasing.describe(since));
                if is_self {
                    format!("You have {}", suffix)
                } else {
                    format!("{} has {}", user.name, suffix)
                }
            }
            None => {
                let suffix = format!("not following {}", broadcaster);
                if is_self {
                    format!("You are {}", suffix)
                } else {
                    format!("{} is {}", user.name, suffix)
                }
            }
        };

        ctx.respond_with(&text, self.method).await
    }
}

pub struct FollowAgeModule {
    settings: FollowAgeSettings,
}

impl FollowAgeModule {
    pub fn new(settings: FollowAgeSettings) -> Self {
        Self { settings }
    }

    fn command(&self, name: &str, phrasing: Phrasing, method: MessageAction) -> Command {
        Command::new(name, FollowCommand { phrasing, method })
            .with_cooldowns(
                Duration::from_secs(self.settings.global_cd),
                Duration::from_secs(self.settings.user_cd),
            )
            .with_whisper(true)
            .deferred()
    }
}

#[async_trait]
impl Module for FollowAgeModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Followage"
    }

    fn description(&self) -> &str {
        "Enables the usage of the !followage and !followsince commands"
    }

    fn category(&self) -> &str {
        "Basic"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()
    }

    fn commands(&self) -> Vec<Command> {
        let followage = self
            .command("followage", Phrasing::Age, self.settings.action_followage)
            .with_description("Check your or someone elses followage for a channel")
            .with_example(CommandExample::new(
                "Check your own followage",
                "user:!followage\nbot:pajlada, you have been following Karl_Kons for 4 months and 24 days",
                "Check how long you have been following the current streamer",
            ))
            .with_example(CommandExample::new(
                "Check someones followage for a certain streamer",
                "user:!followage NightNacht forsen\nbot:pajlada, NightNacht has been following forsen for 1 year and 4 months",
                "Check how long NightNacht has been following forsen",
            ));

        let followsince = self
            .command("followsince", Phrasing::Since, self.settings.action_followsince)
            .with_description("Check from when you or someone else first followed a channel")
            .with_example(CommandExample::new(
                "Check your own follow since",
                "user:!followsince\nbot:pajlada, you have been following Karl_Kons since 04 March 2015, 07:02:01 UTC",
                "Check when you first followed the current streamer",
            ));

        vec![followage, followsince]
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert("global_cd".to_string(), self.settings.global_cd.to_string());
        meta.insert("user_cd".to_string(), self.settings.user_cd.to_string());
        meta
    }
}
