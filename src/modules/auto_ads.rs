//! Scheduled ad breaks with a chat warning beforehand

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::context::{BotContext, CommandContext};
use crate::application::errors::{BotError, ConfigError};
use crate::domain::entities::{Command, CommandHandler};
use crate::domain::traits::{job_fn, CommercialOutcome, JobHandle, JobSpec};
use crate::modules::settings::{check_len, check_option, check_range};
use crate::modules::trait_def::{Module, ModuleContext};

pub const ID: &str = "auto_ads";

/// Ad lengths the platform accepts, in seconds
pub const AD_LENGTHS: [u32; 6] = [30, 60, 90, 120, 150, 180];

/// Minute past the hour the ad break runs
const ADS_MINUTE: u32 = 0;
/// Minute past the hour chat gets warned
const WARNING_MINUTE: u32 = 58;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AdsSettings {
    pub command_name: String,
    pub command_level: u32,
    pub ads_length: u32,
    pub warning_message: String,
}

impl Default for AdsSettings {
    fn default() -> Self {
        Self {
            command_name: "ads".to_string(),
            command_level: 500,
            ads_length: 60,
            warning_message: "Heads up: ads will run at the top of the hour so they don't interrupt you \
                              at a random moment. Subscribe to skip them!"
                .to_string(),
        }
    }
}

impl AdsSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_len("command_name", &self.command_name, 2, 15)?;
        check_range("command_level", self.command_level, 101, 2000)?;
        check_option("ads_length", self.ads_length, &AD_LENGTHS)?;
        check_len("warning_message", &self.warning_message, 1, 500)?;
        Ok(())
    }
}

/// Shared by the command and both jobs
struct AdsRunner {
    settings: AdsSettings,
    enabled: AtomicBool,
}

impl AdsRunner {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn run_ads(&self, bot: &BotContext) -> Result<CommercialOutcome, BotError> {
        if !self.is_enabled() {
            return Ok(refused("module is disabled"));
        }
        if !bot.is_online().await? {
            return Ok(refused("stream is offline"));
        }

        let outcome = bot
            .platform
            .start_commercial(&bot.streamer.id, self.settings.ads_length)
            .await?;
        if !outcome.message.is_empty() {
            info!("Platform responded with `{}` for ads", outcome.message);
        }
        Ok(outcome)
    }

    async fn warn_chat(&self, bot: &BotContext) -> Result<(), BotError> {
        if !self.is_enabled() || !bot.is_online().await? {
            return Ok(());
        }
        bot.replies.say(&self.settings.warning_message).await
    }
}

fn refused(message: &str) -> CommercialOutcome {
    CommercialOutcome {
        message: message.to_string(),
        success: false,
    }
}

struct RunAdsCommand {
    runner: Arc<AdsRunner>,
}

#[async_trait]
impl CommandHandler for RunAdsCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<(), BotError> {
        let outcome = self.runner.run_ads(&ctx.bot).await?;
        let verdict = if outcome.success { "successful" } else { "unsuccessful" };

        let text = if !outcome.message.is_empty() {
            format!("Ads run was {}. Twitch responded with `{}`.", verdict, outcome.message)
        } else if outcome.success {
            format!(
                "Ads run was {}. Twitch didn't send back a bad response so we assume the ads ran.",
                verdict
            )
        } else {
            format!("Ads run was {}. Twitch didn't provide a response.", verdict)
        };

        ctx.bot.replies.whisper(&ctx.source, &text).await
    }
}

pub struct AutoAdsModule {
    runner: Arc<AdsRunner>,
    ads_job: Option<JobHandle>,
    warning_job: Option<JobHandle>,
}

impl AutoAdsModule {
    pub fn new(settings: AdsSettings) -> Self {
        Self {
            runner: Arc::new(AdsRunner {
                settings,
                enabled: AtomicBool::new(false),
            }),
            ads_job: None,
            warning_job: None,
        }
    }

    pub fn settings(&self) -> &AdsSettings {
        &self.runner.settings
    }

    /// Handles of the jobs currently scheduled
    pub fn jobs(&self) -> Vec<&JobHandle> {
        self.ads_job.iter().chain(self.warning_job.iter()).collect()
    }

    async fn cancel_jobs(&mut self, ctx: &ModuleContext) {
        if let Some(handle) = self.ads_job.take() {
            ctx.scheduler.cancel(&handle).await;
        }
        if let Some(handle) = self.warning_job.take() {
            ctx.scheduler.cancel(&handle).await;
        }
    }
}

#[async_trait]
impl Module for AutoAdsModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "AutoAds"
    }

    fn description(&self) -> &str {
        "Automatically run ads"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.runner.settings.validate()
    }

    fn commands(&self) -> Vec<Command> {
        let settings = &self.runner.settings;
        vec![Command::new(
            &settings.command_name,
            RunAdsCommand {
                runner: self.runner.clone(),
            },
        )
        .with_description("Run an ad break now")
        .with_level(settings.command_level)
        .deferred()]
    }

    async fn on_enable(&mut self, ctx: &ModuleContext) -> Result<(), BotError> {
        self.cancel_jobs(ctx).await;
        self.runner.enabled.store(true, Ordering::SeqCst);

        let (runner, bot) = (self.runner.clone(), ctx.bot.clone());
        let ads = job_fn(move || {
            let (runner, bot) = (runner.clone(), bot.clone());
            async move { runner.run_ads(&bot).await.map(|_| ()) }
        });
        self.ads_job = Some(
            ctx.scheduler
                .schedule("auto_ads: run ads", JobSpec::HourlyAt { minute: ADS_MINUTE }, ads)
                .await?,
        );

        let (runner, bot) = (self.runner.clone(), ctx.bot.clone());
        let warning = job_fn(move || {
            let (runner, bot) = (runner.clone(), bot.clone());
            async move { runner.warn_chat(&bot).await }
        });
        let scheduled = ctx
            .scheduler
            .schedule("auto_ads: warn chat", JobSpec::HourlyAt { minute: WARNING_MINUTE }, warning)
            .await;
        match scheduled {
            Ok(handle) => self.warning_job = Some(handle),
            Err(e) => {
                self.cancel_jobs(ctx).await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn on_disable(&mut self, ctx: &ModuleContext) {
        self.runner.enabled.store(false, Ordering::SeqCst);
        self.cancel_jobs(ctx).await;
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert("ads_length".to_string(), self.runner.settings.ads_length.to_string());
        meta.insert("scheduled_jobs".to_string(), self.jobs().len().to_string());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(AdsSettings::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let mut settings = AdsSettings::default();
        settings.command_level = 100;
        assert!(settings.validate().is_err());

        let mut settings = AdsSettings::default();
        settings.ads_length = 45;
        assert!(settings.validate().is_err());

        let mut settings = AdsSettings::default();
        settings.command_name = "a".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn command_uses_configured_name_and_level() {
        let module = AutoAdsModule::new(AdsSettings {
            command_name: "!RunAds".to_string(),
            command_level: 750,
            ..AdsSettings::default()
        });
        let commands = module.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "runads");
        assert_eq!(commands[0].level, 750);
    }
}
