//! Module manager - handles module lifecycle and command ownership

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::errors::BotError;
use crate::domain::entities::CommandRegistry;
use crate::modules::trait_def::{Module, ModuleContext, ModuleState};

struct ModuleSlot {
    module: Box<dyn Module>,
    state: ModuleState,
    /// Command names this module registered and may remove
    commands: Vec<String>,
    enabled_in_config: bool,
}

/// Owns every loaded module and switches them on and off
pub struct ModuleManager {
    modules: Vec<ModuleSlot>,
    registry: Arc<CommandRegistry>,
    ctx: ModuleContext,
}

impl ModuleManager {
    pub fn new(registry: Arc<CommandRegistry>, ctx: ModuleContext) -> Self {
        Self {
            modules: Vec::new(),
            registry,
            ctx,
        }
    }

    /// Load a module in the disabled state. Settings are validated here.
    pub fn register<M: Module + 'static>(&mut self, module: M) -> Result<(), BotError> {
        self.register_boxed(Box::new(module), false)
    }

    /// Load a module and remember whether config wants it enabled
    pub fn register_configured<M: Module + 'static>(&mut self, module: M, enabled: bool) -> Result<(), BotError> {
        self.register_boxed(Box::new(module), enabled)
    }

    fn register_boxed(&mut self, module: Box<dyn Module>, enabled_in_config: bool) -> Result<(), BotError> {
        let id = module.id().to_string();

        if self.position(&id).is_some() {
            return Err(BotError::InvalidInput(format!("Module '{}' already registered", id)));
        }
        module.validate()?;

        info!("Registering module: {}", id);
        self.modules.push(ModuleSlot {
            module,
            state: ModuleState::Disabled,
            commands: Vec::new(),
            enabled_in_config,
        });
        Ok(())
    }

    /// Enable a module. Calling it again re-creates commands and jobs without duplicates.
    pub async fn enable(&mut self, id: &str) -> Result<(), BotError> {
        let index = self.require(id)?;
        let slot = &mut self.modules[index];

        slot.module.validate()?;

        if slot.state != ModuleState::Disabled {
            debug!("Module '{}' is {}, tearing down before re-enable", id, slot.state);
            teardown(slot, &self.registry, &self.ctx).await;
        }

        slot.state = ModuleState::Enabling;
        for command in slot.module.commands() {
            let registered = self.registry.register(id, command);
            slot.commands.push(registered.name.clone());
        }

        if let Err(e) = slot.module.on_enable(&self.ctx).await {
            warn!("Module '{}' failed to start: {}", id, e);
            teardown(slot, &self.registry, &self.ctx).await;
            slot.state = ModuleState::Disabled;
            return Err(e);
        }

        slot.state = ModuleState::Enabled;
        info!("Enabled module '{}' with commands {:?}", id, slot.commands);
        Ok(())
    }

    /// Disable a module. Disabling a disabled module does nothing.
    pub async fn disable(&mut self, id: &str) -> Result<(), BotError> {
        let index = self.require(id)?;
        let slot = &mut self.modules[index];

        if slot.state == ModuleState::Disabled {
            debug!("Module '{}' already disabled", id);
            return Ok(());
        }

        slot.state = ModuleState::Disabling;
        teardown(slot, &self.registry, &self.ctx).await;
        slot.state = ModuleState::Disabled;
        info!("Disabled module '{}'", id);
        Ok(())
    }

    /// Enable every module flagged in config. Failures are logged and skipped.
    pub async fn enable_configured(&mut self) -> usize {
        let ids: Vec<String> = self
            .modules
            .iter()
            .filter(|slot| slot.enabled_in_config)
            .map(|slot| slot.module.id().to_string())
            .collect();

        let mut enabled = 0;
        for id in ids {
            match self.enable(&id).await {
                Ok(()) => enabled += 1,
                Err(e) => warn!("Could not enable module '{}': {}", id, e),
            }
        }
        enabled
    }

    pub async fn disable_all(&mut self) {
        let ids: Vec<String> = self.modules.iter().map(|s| s.module.id().to_string()).collect();
        for id in ids {
            if let Err(e) = self.disable(&id).await {
                warn!("Could not disable module '{}': {}", id, e);
            }
        }
    }

    pub fn state(&self, id: &str) -> Option<ModuleState> {
        self.position(id).map(|i| self.modules[i].state)
    }

    pub fn has_module(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// List all loaded modules
    pub fn list_modules(&self) -> Vec<ModuleInfo> {
        self.modules
            .iter()
            .map(|slot| ModuleInfo {
                id: slot.module.id().to_string(),
                name: slot.module.name().to_string(),
                description: slot.module.description().to_string(),
                category: slot.module.category().to_string(),
                state: slot.state,
                commands: slot.commands.clone(),
                metadata: slot.module.metadata(),
            })
            .collect()
    }

    pub fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.modules.iter().position(|slot| slot.module.id() == id)
    }

    fn require(&self, id: &str) -> Result<usize, BotError> {
        self.position(id)
            .ok_or_else(|| BotError::NotFound(format!("Module '{}' not found", id)))
    }
}

/// Release everything a module holds
async fn teardown(slot: &mut ModuleSlot, registry: &CommandRegistry, ctx: &ModuleContext) {
    let id = slot.module.id().to_string();
    for name in slot.commands.drain(..) {
        if !registry.unregister_owned(&id, &name) {
            debug!("Command '{}' no longer owned by '{}', leaving it", name, id);
        }
    }
    slot.module.on_disable(ctx).await;
}

/// Module information for listing
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub state: ModuleState,
    pub commands: Vec<String>,
    pub metadata: HashMap<String, String>,
}
