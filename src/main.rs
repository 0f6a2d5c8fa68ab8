use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use chatmod_bot::application::context::BotContext;
use chatmod_bot::application::errors::BotError;
use chatmod_bot::application::executor::ActionQueue;
use chatmod_bot::application::messaging::{DispatchOutcome, MessageDispatcher};
use chatmod_bot::application::reply::ReplyChannel;
use chatmod_bot::domain::entities::{CommandRegistry, Message, User};
use chatmod_bot::domain::traits::{Bot, PlatformApi, Store};
use chatmod_bot::infrastructure::adapters::{ConsoleAdapter, ConsoleLine};
use chatmod_bot::infrastructure::config::Config;
use chatmod_bot::infrastructure::database::SqliteStore;
use chatmod_bot::infrastructure::scheduler::CronScheduler;
use chatmod_bot::infrastructure::twitch::{HelixClient, OfflinePlatform};
use chatmod_bot::modules::{
    AutoAdsModule, FollowAgeModule, MassPointsModule, Module, ModuleContext, ModuleManager,
    SongRequestModule,
};

#[derive(Parser)]
#[command(name = "chatmod-bot")]
#[command(about = "Chat command bot with toggleable feature modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console transport
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List modules and the commands they provide
    Modules,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run(&cli.config),
        Commands::Version => {
            println!("chatmod-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig { output } => init_config(output.as_deref()),
        Commands::Modules => list_modules(&cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<Config, BotError> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        tracing::info!("No config at {}, using environment", path.display());
        let config = Config::load_env();
        config.validate()?;
        Ok(config)
    }
}

fn run(config_path: &Path) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Unexpected(format!("Failed to start runtime: {}", e)))?;
    runtime.block_on(run_bot(config))
}

async fn run_bot(config: Config) -> Result<(), BotError> {
    tracing::info!("Starting {} for #{}", config.bot.name, config.bot.channel);

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.database.path)?);
    tracing::info!("Database initialized");

    let platform: Arc<dyn PlatformApi> = match &config.twitch {
        Some(twitch) => Arc::new(HelixClient::new(
            &twitch.api_base,
            twitch.client_id.clone(),
            twitch.bot_token.clone(),
            twitch.streamer_token.clone(),
        )?),
        None => {
            tracing::warn!("No twitch section configured, platform lookups are disabled");
            Arc::new(OfflinePlatform)
        }
    };

    let console = Arc::new(ConsoleAdapter::new(config.bot.channel.clone()));
    console.start().await?;

    let streamer = User::new(config.bot.streamer.id.clone(), config.bot.streamer.login.clone())
        .with_level(config.level_for(&config.bot.streamer.login));
    let actions = ActionQueue::new(config.executor.workers);
    let bot = Arc::new(
        BotContext::new(
            streamer,
            store.clone(),
            platform,
            ReplyChannel::new(console.clone()),
            actions.clone(),
        )
        .with_trigger(config.bot.trigger),
    );

    let registry = Arc::new(CommandRegistry::new(config.bot.trigger));
    let scheduler = Arc::new(CronScheduler::new().await?);
    let mut manager = ModuleManager::new(
        registry.clone(),
        ModuleContext {
            bot: bot.clone(),
            scheduler: scheduler.clone(),
        },
    );
    register_modules(&mut manager, &config)?;
    let enabled = manager.enable_configured().await;
    tracing::info!("Enabled {} modules, {} commands registered", enabled, registry.len());

    let dispatcher = MessageDispatcher::new(bot.clone(), registry);
    let mut session = ConsoleSession {
        config,
        store,
        dispatcher,
        manager,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type `login: message`, `login: /me action`, `/whisper login message` or `:quit`");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        };

        if session.handle_line(ConsoleLine::parse(&line)).await.is_break() {
            break;
        }
    }

    session.manager.disable_all().await;
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("{}", e);
    }
    actions.shutdown().await;
    tracing::info!(
        "Stopped after {} tasks ({} failed)",
        actions.completed(),
        actions.failed()
    );
    Ok(())
}

/// What the console loop works against
struct ConsoleSession {
    config: Config,
    store: Arc<dyn Store>,
    dispatcher: MessageDispatcher,
    manager: ModuleManager,
}

impl ConsoleSession {
    /// Handle one console line. Only `:quit` breaks; failures are logged.
    async fn handle_line(&mut self, line: ConsoleLine) -> ControlFlow<()> {
        match line {
            ConsoleLine::Empty => {}
            ConsoleLine::Quit => return ControlFlow::Break(()),
            ConsoleLine::Invalid(reason) => println!("{}", reason),
            ConsoleLine::Chat { login, text, kind } => {
                let sender = match console_user(self.store.as_ref(), &self.config, &login).await {
                    Ok(sender) => sender,
                    Err(e) => {
                        tracing::error!("Could not load user {}: {}", login, e);
                        return ControlFlow::Continue(());
                    }
                };
                let message = Message::new(self.config.bot.channel.clone(), sender, text).with_kind(kind);
                handle_message(&self.dispatcher, message).await;
            }
            ConsoleLine::Whisper { login, text } => {
                let sender = match console_user(self.store.as_ref(), &self.config, &login).await {
                    Ok(sender) => sender,
                    Err(e) => {
                        tracing::error!("Could not load user {}: {}", login, e);
                        return ControlFlow::Continue(());
                    }
                };
                handle_message(&self.dispatcher, Message::whisper(sender, text)).await;
            }
            ConsoleLine::Enable(id) => match self.manager.enable(&id).await {
                Ok(()) => println!("Module {} enabled", id),
                Err(e) => println!("Could not enable {}: {}", id, e),
            },
            ConsoleLine::Disable(id) => match self.manager.disable(&id).await {
                Ok(()) => println!("Module {} disabled", id),
                Err(e) => println!("Could not disable {}: {}", id, e),
            },
            ConsoleLine::Live(title) => match self.store.start_stream(&title).await {
                Ok(id) => println!("Stream {} is live", id),
                Err(e) => tracing::error!("Could not start stream: {}", e),
            },
            ConsoleLine::Offline => match self.store.end_stream().await {
                Ok(true) => println!("Stream ended"),
                Ok(false) => println!("Stream was not live"),
                Err(e) => tracing::error!("Could not end stream: {}", e),
            },
            ConsoleLine::Modules => {
                for info in self.manager.list_modules() {
                    println!("{:<12} {:<10} {:?}", info.id, info.state, info.commands);
                }
            }
        }
        ControlFlow::Continue(())
    }
}

async fn handle_message(dispatcher: &MessageDispatcher, message: Message) {
    match dispatcher.process(message).await {
        Ok(DispatchOutcome::UnknownCommand(name)) => tracing::debug!("Unknown command {}", name),
        Ok(DispatchOutcome::Refused(reason)) => tracing::debug!("Refused: {}", reason),
        Ok(_) => {}
        Err(e) => tracing::error!("Command failed: {}", e),
    }
}

/// Console users are known by login; levels always come from config
async fn console_user(store: &dyn Store, config: &Config, login: &str) -> Result<User, BotError> {
    let user = store
        .find_user_by_login(login)
        .await?
        .unwrap_or_else(|| User::new(login, login));
    Ok(user.with_level(config.level_for(login)))
}

fn register_modules(manager: &mut ModuleManager, config: &Config) -> Result<(), BotError> {
    let modules = &config.modules;
    manager.register_configured(AutoAdsModule::new(modules.auto_ads.settings.clone()), modules.auto_ads.enabled)?;
    manager.register_configured(FollowAgeModule::new(modules.followage.settings.clone()), modules.followage.enabled)?;
    manager.register_configured(MassPointsModule::new(modules.masspoints.settings.clone()), modules.masspoints.enabled)?;
    manager.register_configured(SongRequestModule::new(modules.songrequest.settings.clone()), modules.songrequest.enabled)?;
    Ok(())
}

fn list_modules(config_path: &Path) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    let modules = &config.modules;
    let rows: Vec<(Box<dyn Module>, bool)> = vec![
        (Box::new(AutoAdsModule::new(modules.auto_ads.settings.clone())), modules.auto_ads.enabled),
        (Box::new(FollowAgeModule::new(modules.followage.settings.clone())), modules.followage.enabled),
        (Box::new(MassPointsModule::new(modules.masspoints.settings.clone())), modules.masspoints.enabled),
        (Box::new(SongRequestModule::new(modules.songrequest.settings.clone())), modules.songrequest.enabled),
    ];

    for (module, enabled) in rows {
        let commands: Vec<String> = module
            .commands()
            .iter()
            .map(|c| format!("{}{}", config.bot.trigger, c.name))
            .collect();
        println!(
            "{:<12} [{}] {} - {}",
            module.id(),
            if enabled { "enabled" } else { "disabled" },
            module.name(),
            module.description()
        );
        if !commands.is_empty() {
            println!("             commands: {}", commands.join(", "));
        }
    }
    Ok(())
}

fn init_config(output: Option<&Path>) -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    match output {
        Some(path) => {
            std::fs::write(path, yaml)
                .map_err(|e| BotError::Unexpected(format!("Failed to write {}: {}", path.display(), e)))?;
            println!("Wrote default config to {}", path.display());
        }
        None => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatmod_bot::application::errors::StorageError;
    use chatmod_bot::domain::entities::{SongInfo, SongRequest};
    use chrono::{DateTime, Utc};

    /// Store whose every operation fails, as with a locked or missing database
    struct BrokenStore;

    fn broken<T>() -> Result<T, StorageError> {
        Err(StorageError::NotFound("database unavailable".to_string()))
    }

    #[async_trait]
    impl Store for BrokenStore {
        async fn get_user(&self, _id: &str) -> Result<Option<User>, StorageError> {
            broken()
        }
        async fn find_user_by_login(&self, _login: &str) -> Result<Option<User>, StorageError> {
            broken()
        }
        async fn save_user(&self, _user: &User) -> Result<(), StorageError> {
            broken()
        }
        async fn touch_user(&self, _user: &User, _now: DateTime<Utc>) -> Result<(), StorageError> {
            broken()
        }
        async fn add_points_to_active(&self, _amount: i64, _since: DateTime<Utc>) -> Result<u64, StorageError> {
            broken()
        }
        async fn charge_points(&self, _user_id: &str, _cost: i64) -> Result<bool, StorageError> {
            broken()
        }
        async fn refund_points(&self, _user_id: &str, _amount: i64) -> Result<(), StorageError> {
            broken()
        }
        async fn current_stream_id(&self) -> Result<Option<i64>, StorageError> {
            broken()
        }
        async fn start_stream(&self, _title: &str) -> Result<i64, StorageError> {
            broken()
        }
        async fn end_stream(&self) -> Result<bool, StorageError> {
            broken()
        }
        async fn find_song_info(&self, _youtube_id: &str) -> Result<Option<SongInfo>, StorageError> {
            broken()
        }
        async fn save_song_info(&self, _info: &SongInfo) -> Result<(), StorageError> {
            broken()
        }
        async fn count_unplayed_songs(&self, _stream_id: i64, _user_id: &str) -> Result<u32, StorageError> {
            broken()
        }
        async fn add_song_request(&self, _request: &SongRequest) -> Result<i64, StorageError> {
            broken()
        }
    }

    async fn session(store: Arc<dyn Store>) -> ConsoleSession {
        let console = Arc::new(ConsoleAdapter::recording("forsen"));
        let bot = Arc::new(BotContext::new(
            User::new("22", "forsen"),
            store.clone(),
            Arc::new(OfflinePlatform),
            ReplyChannel::new(console),
            ActionQueue::new(1),
        ));
        let registry = Arc::new(CommandRegistry::new('!'));
        let scheduler = Arc::new(CronScheduler::new().await.unwrap());
        let manager = ModuleManager::new(
            registry.clone(),
            ModuleContext {
                bot: bot.clone(),
                scheduler,
            },
        );

        ConsoleSession {
            config: Config::default(),
            store,
            dispatcher: MessageDispatcher::new(bot, registry),
            manager,
        }
    }

    #[tokio::test]
    async fn storage_failures_keep_the_console_running() {
        let mut session = session(Arc::new(BrokenStore)).await;

        for line in [":live Music", "pajlada: hello", "/whisper pajlada hi", ":offline", ":modules"] {
            assert_eq!(
                session.handle_line(ConsoleLine::parse(line)).await,
                ControlFlow::Continue(()),
                "{}",
                line
            );
        }
        assert_eq!(session.handle_line(ConsoleLine::parse(":quit")).await, ControlFlow::Break(()));
    }

    #[tokio::test]
    async fn stream_toggles_reach_the_store() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut session = session(store.clone()).await;

        session.handle_line(ConsoleLine::parse(":live Music")).await;
        assert!(store.current_stream_id().await.unwrap().is_some());
        session.handle_line(ConsoleLine::parse(":offline")).await;
        assert!(store.current_stream_id().await.unwrap().is_none());
    }
}
