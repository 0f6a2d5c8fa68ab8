use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::context::CommandContext;
use crate::application::errors::BotError;
use crate::application::messaging::cooldown::CooldownGate;
use crate::domain::entities::user::DEFAULT_LEVEL;

/// Command handler - the behaviour behind a command
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: CommandContext) -> Result<(), BotError>;
}

/// Adapts an async closure into a [`CommandHandler`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    async fn handle(&self, ctx: CommandContext) -> Result<(), BotError> {
        (self.0)(ctx).await
    }
}

/// Where the dispatcher runs a command's body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Awaited on the ingestion path
    Inline,
    /// Submitted to the action queue
    Deferred,
}

/// Example chat transcript, used for documentation only
#[derive(Debug, Clone)]
pub struct CommandExample {
    pub title: String,
    pub chat: Vec<String>,
    pub description: String,
}

impl CommandExample {
    pub fn new(title: impl Into<String>, chat: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            chat: chat.lines().map(|l| l.to_string()).collect(),
            description: description.into(),
        }
    }
}

/// Represents a bot command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub handler: Arc<dyn CommandHandler>,
    pub level: u32,
    pub delay_all: Duration,
    pub delay_user: Duration,
    pub can_execute_with_whisper: bool,
    pub cost: i64,
    pub execution: Execution,
    pub notify_on_cooldown: bool,
    pub examples: Vec<CommandExample>,
}

impl Command {
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: normalize_name(name, '!'),
            description: None,
            handler: Arc::new(handler),
            level: DEFAULT_LEVEL,
            delay_all: Duration::ZERO,
            delay_user: Duration::ZERO,
            can_execute_with_whisper: false,
            cost: 0,
            execution: Execution::Inline,
            notify_on_cooldown: false,
            examples: Vec::new(),
        }
    }

    pub fn from_fn<F, Fut>(name: &str, f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        Self::new(name, FnHandler(f))
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_cooldowns(mut self, delay_all: Duration, delay_user: Duration) -> Self {
        self.delay_all = delay_all;
        self.delay_user = delay_user;
        self
    }

    pub fn with_whisper(mut self, allowed: bool) -> Self {
        self.can_execute_with_whisper = allowed;
        self
    }

    pub fn with_cost(mut self, cost: i64) -> Self {
        self.cost = cost.max(0);
        self
    }

    pub fn deferred(mut self) -> Self {
        self.execution = Execution::Deferred;
        self
    }

    pub fn notify_on_cooldown(mut self) -> Self {
        self.notify_on_cooldown = true;
        self
    }

    pub fn with_example(mut self, example: CommandExample) -> Self {
        self.examples.push(example);
        self
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("delay_all", &self.delay_all)
            .field("delay_user", &self.delay_user)
            .field("can_execute_with_whisper", &self.can_execute_with_whisper)
            .field("cost", &self.cost)
            .field("execution", &self.execution)
            .finish()
    }
}

/// Lower-case, drop whitespace and a single leading trigger character
pub fn normalize_name(raw: &str, trigger: char) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(trigger).unwrap_or(trimmed);
    trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

struct RegisteredCommand {
    owner: String,
    command: Arc<Command>,
}

/// Command registry for managing available commands
pub struct CommandRegistry {
    trigger: char,
    commands: RwLock<HashMap<String, RegisteredCommand>>,
    cooldowns: Arc<CooldownGate>,
}

impl CommandRegistry {
    pub fn new(trigger: char) -> Self {
        Self {
            trigger,
            commands: RwLock::new(HashMap::new()),
            cooldowns: Arc::new(CooldownGate::new()),
        }
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }

    pub fn cooldowns(&self) -> &Arc<CooldownGate> {
        &self.cooldowns
    }

    /// Register a command on behalf of `owner`. Last registration wins.
    pub fn register(&self, owner: &str, mut command: Command) -> Arc<Command> {
        let name = normalize_name(&command.name, self.trigger);
        command.name = name.clone();
        let command = Arc::new(command);

        let mut commands = self.commands.write().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = commands.insert(
            name.clone(),
            RegisteredCommand {
                owner: owner.to_string(),
                command: command.clone(),
            },
        ) {
            if previous.owner != owner {
                tracing::info!("Command '{}' taken over by '{}' from '{}'", name, owner, previous.owner);
            }
        }
        drop(commands);

        self.cooldowns.forget(&name);
        command
    }

    /// Look up a command from raw chat input
    pub fn resolve(&self, raw: &str) -> Option<Arc<Command>> {
        let name = normalize_name(raw, self.trigger);
        self.commands
            .read()
            .ok()?
            .get(&name)
            .map(|entry| entry.command.clone())
    }

    /// Remove a command. Unknown names are ignored.
    pub fn unregister(&self, name: &str) -> bool {
        let name = normalize_name(name, self.trigger);
        let removed = self
            .commands
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name)
            .is_some();
        if removed {
            self.cooldowns.forget(&name);
        }
        removed
    }

    /// Remove a command only while `owner` still holds it
    pub fn unregister_owned(&self, owner: &str, name: &str) -> bool {
        let name = normalize_name(name, self.trigger);
        let mut commands = self.commands.write().unwrap_or_else(|e| e.into_inner());
        match commands.get(&name) {
            Some(entry) if entry.owner == owner => {
                commands.remove(&name);
                drop(commands);
                self.cooldowns.forget(&name);
                true
            }
            _ => false,
        }
    }

    pub fn owner_of(&self, name: &str) -> Option<String> {
        let name = normalize_name(name, self.trigger);
        self.commands
            .read()
            .ok()?
            .get(&name)
            .map(|entry| entry.owner.clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new('!')
    }
}
