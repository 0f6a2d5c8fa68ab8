//! Configuration management

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::errors::ConfigError;
use crate::domain::entities::user::DEFAULT_LEVEL;
use crate::infrastructure::twitch::API_BASE;
use crate::modules::settings::check_range;
use crate::modules::{AdsSettings, FollowAgeSettings, MassPointsSettings, SongRequestSettings};

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub executor: ExecutorConfig,
    pub database: DatabaseConfig,
    pub twitch: Option<TwitchConfig>,
    pub modules: ModulesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub channel: String,
    /// Character that starts a command, `!` by default
    pub trigger: char,
    pub streamer: StreamerConfig,
    /// Permission level per login; everyone else gets the default level
    pub levels: HashMap<String, u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StreamerConfig {
    pub id: String,
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExecutorConfig {
    /// Worker tasks draining the action queue
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TwitchConfig {
    pub client_id: String,
    pub bot_token: String,
    /// Needed for commercials
    pub streamer_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    API_BASE.to_string()
}

/// Switch plus typed settings for one module
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ModuleConfig<T: Default> {
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: T,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ModulesConfig {
    pub auto_ads: ModuleConfig<AdsSettings>,
    pub followage: ModuleConfig<FollowAgeSettings>,
    pub masspoints: ModuleConfig<MassPointsSettings>,
    pub songrequest: ModuleConfig<SongRequestSettings>,
}

impl Default for BotConfig {
    fn default() -> Self {
        let mut levels = HashMap::new();
        levels.insert("pajlada".to_string(), 2000);
        Self {
            name: "chatmod-bot".to_string(),
            channel: "pajlada".to_string(),
            trigger: '!',
            streamer: StreamerConfig::default(),
            levels,
        }
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            id: "11148817".to_string(),
            login: "pajlada".to_string(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/chatmod-bot.db"),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(format!("Failed to write config: {}", e)))
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(channel) = std::env::var("CHATMOD_CHANNEL") {
            config.bot.channel = channel.to_lowercase();
            config.bot.streamer.login = config.bot.channel.clone();
        }

        if let Ok(path) = std::env::var("CHATMOD_DATABASE") {
            config.database.path = PathBuf::from(path);
        }

        if let (Ok(client_id), Ok(bot_token)) =
            (std::env::var("TWITCH_CLIENT_ID"), std::env::var("TWITCH_BOT_TOKEN"))
        {
            config.twitch = Some(TwitchConfig {
                client_id,
                bot_token,
                streamer_token: std::env::var("TWITCH_STREAMER_TOKEN").ok(),
                api_base: default_api_base(),
            });
        }

        config
    }

    /// Check every section against its declared constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.channel.is_empty() {
            return Err(ConfigError::MissingField("bot.channel".to_string()));
        }
        if self.bot.streamer.id.is_empty() {
            return Err(ConfigError::MissingField("bot.streamer.id".to_string()));
        }
        if self.bot.trigger.is_alphanumeric() || self.bot.trigger.is_whitespace() {
            return Err(ConfigError::invalid("bot.trigger", "must be a symbol"));
        }
        check_range("executor.workers", self.executor.workers, 1, 64)?;

        self.modules.auto_ads.settings.validate()?;
        self.modules.followage.settings.validate()?;
        self.modules.masspoints.settings.validate()?;
        self.modules.songrequest.settings.validate()?;
        Ok(())
    }

    /// Configured level for `login`, or the default level
    pub fn level_for(&self, login: &str) -> u32 {
        self.bot
            .levels
            .get(&login.to_lowercase())
            .copied()
            .unwrap_or(DEFAULT_LEVEL)
    }
}
