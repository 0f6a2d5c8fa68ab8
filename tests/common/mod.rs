//! Shared harness for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chatmod_bot::application::context::BotContext;
use chatmod_bot::application::errors::BotError;
use chatmod_bot::application::executor::ActionQueue;
use chatmod_bot::application::messaging::{DispatchOutcome, MessageDispatcher};
use chatmod_bot::application::reply::ReplyChannel;
use chatmod_bot::domain::entities::{CommandRegistry, Message, SongInfo, User};
use chatmod_bot::domain::traits::{CommercialOutcome, PlatformApi, SongInfoProvider};
use chatmod_bot::infrastructure::adapters::{ConsoleAdapter, Outbound};
use chatmod_bot::infrastructure::database::SqliteStore;
use chatmod_bot::infrastructure::scheduler::CronScheduler;
use chatmod_bot::modules::{ModuleContext, ModuleManager};

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const CHANNEL: &str = "forsen";

pub fn streamer() -> User {
    User::new("22", "forsen").with_name("Forsen")
}

/// Platform double with canned users and follows
#[derive(Default)]
pub struct FakePlatform {
    users: Mutex<HashMap<String, User>>,
    follows: Mutex<HashMap<(String, String), DateTime<Utc>>>,
    deny_follows: Mutex<bool>,
    commercials: Mutex<Vec<(String, u32)>>,
}

impl FakePlatform {
    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.login.clone(), user);
    }

    pub fn add_follow(&self, broadcaster: &User, user: &User, since: DateTime<Utc>) {
        self.follows
            .lock()
            .unwrap()
            .insert((broadcaster.id.clone(), user.id.clone()), since);
    }

    pub fn deny_follows(&self) {
        *self.deny_follows.lock().unwrap() = true;
    }

    pub fn commercials(&self) -> Vec<(String, u32)> {
        self.commercials.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, BotError> {
        Ok(self.users.lock().unwrap().get(login).cloned())
    }

    async fn get_follow_since(
        &self,
        broadcaster_id: &str,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, BotError> {
        if *self.deny_follows.lock().unwrap() {
            return Err(BotError::PermissionDenied("follow lookup unauthorized".to_string()));
        }
        Ok(self
            .follows
            .lock()
            .unwrap()
            .get(&(broadcaster_id.to_string(), user_id.to_string()))
            .copied())
    }

    async fn start_commercial(&self, broadcaster_id: &str, length: u32) -> Result<CommercialOutcome, BotError> {
        self.commercials
            .lock()
            .unwrap()
            .push((broadcaster_id.to_string(), length));
        Ok(CommercialOutcome {
            message: String::new(),
            success: true,
        })
    }
}

/// Song metadata double
#[derive(Default)]
pub struct FakeSongs {
    songs: Mutex<HashMap<String, SongInfo>>,
}

impl FakeSongs {
    pub fn add(&self, youtube_id: &str, title: &str, duration: u32) {
        self.songs.lock().unwrap().insert(
            youtube_id.to_string(),
            SongInfo {
                youtube_id: youtube_id.to_string(),
                title: title.to_string(),
                duration,
            },
        );
    }
}

#[async_trait]
impl SongInfoProvider for FakeSongs {
    async fn fetch(&self, youtube_id: &str) -> Result<Option<SongInfo>, BotError> {
        Ok(self.songs.lock().unwrap().get(youtube_id).cloned())
    }
}

pub struct Harness {
    pub console: Arc<ConsoleAdapter>,
    pub store: Arc<SqliteStore>,
    pub platform: Arc<FakePlatform>,
    pub songs: Arc<FakeSongs>,
    pub actions: ActionQueue,
    pub bot: Arc<BotContext>,
    pub registry: Arc<CommandRegistry>,
    pub scheduler: Arc<CronScheduler>,
    pub dispatcher: MessageDispatcher,
}

impl Harness {
    /// One worker keeps activity bookkeeping ahead of later deferred commands
    pub async fn new() -> Self {
        Self::build(1, true).await
    }

    pub async fn without_song_provider() -> Self {
        Self::build(1, false).await
    }

    async fn build(workers: usize, with_songs: bool) -> Self {
        ensure_init();

        let console = Arc::new(ConsoleAdapter::recording(CHANNEL));
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let platform = Arc::new(FakePlatform::default());
        platform.add_user(streamer());
        let songs = Arc::new(FakeSongs::default());
        let actions = ActionQueue::new(workers);

        let mut bot = BotContext::new(
            streamer(),
            store.clone(),
            platform.clone(),
            ReplyChannel::new(console.clone()),
            actions.clone(),
        );
        if with_songs {
            bot = bot.with_song_provider(songs.clone());
        }
        let bot = Arc::new(bot);

        let registry = Arc::new(CommandRegistry::new('!'));
        let scheduler = Arc::new(CronScheduler::new().await.unwrap());
        let dispatcher = MessageDispatcher::new(bot.clone(), registry.clone());

        Self {
            console,
            store,
            platform,
            songs,
            actions,
            bot,
            registry,
            scheduler,
            dispatcher,
        }
    }

    pub fn manager(&self) -> ModuleManager {
        ModuleManager::new(
            self.registry.clone(),
            ModuleContext {
                bot: self.bot.clone(),
                scheduler: self.scheduler.clone(),
            },
        )
    }

    pub async fn send(&self, user: &User, text: &str) -> DispatchOutcome {
        self.dispatcher
            .process(Message::new(CHANNEL, user.clone(), text))
            .await
            .unwrap()
    }

    pub async fn whisper(&self, user: &User, text: &str) -> DispatchOutcome {
        self.dispatcher
            .process(Message::whisper(user.clone(), text))
            .await
            .unwrap()
    }

    /// Wait for every queued task, including follow-up tasks
    pub async fn settle(&self) {
        assert!(
            self.actions.wait_idle(Duration::from_secs(5)).await,
            "action queue did not go idle"
        );
    }

    pub fn says(&self) -> Vec<String> {
        self.console
            .sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Say(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn whispers_to(&self, login: &str) -> Vec<String> {
        self.console
            .sent()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Whisper(to, text) if to == login => Some(text),
                _ => None,
            })
            .collect()
    }
}
