//! Module trait definitions

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::context::BotContext;
use crate::application::errors::{BotError, ConfigError};
use crate::domain::entities::Command;
use crate::domain::traits::Scheduler;

/// Handles a module needs while being switched on or off
#[derive(Clone)]
pub struct ModuleContext {
    pub bot: Arc<BotContext>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Core trait every feature module implements
#[async_trait]
pub trait Module: Send + Sync {
    /// Unique identifier, used in config and admin commands
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> &str {
        "Feature"
    }

    /// Check settings against their declared constraints
    fn validate(&self) -> Result<(), ConfigError>;

    /// Commands to register while enabled
    fn commands(&self) -> Vec<Command>;

    /// Start owned jobs. Must be safe to call while jobs are already running.
    async fn on_enable(&mut self, _ctx: &ModuleContext) -> Result<(), BotError> {
        Ok(())
    }

    /// Stop owned jobs. Must be safe to call when nothing is running.
    async fn on_disable(&mut self, _ctx: &ModuleContext) {}

    fn metadata(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Lifecycle state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModuleState::Disabled => "disabled",
            ModuleState::Enabling => "enabling",
            ModuleState::Enabled => "enabled",
            ModuleState::Disabling => "disabling",
        };
        f.pad(s)
    }
}
