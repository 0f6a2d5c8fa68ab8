//! Middleware system for the command dispatch pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::errors::CooldownAxis;
use crate::application::messaging::cooldown::{CooldownDecision, CooldownGate};
use crate::application::reply::MessageAction;
use crate::domain::entities::{Command, Message, User};

/// One inbound command invocation
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub source: User,
    /// Text after the command name
    pub message: String,
    pub event: Message,
    pub method: MessageAction,
}

/// Context passed through middleware chain
#[derive(Debug, Clone)]
pub struct Context {
    pub request: DispatchRequest,
    pub command: Arc<Command>,
    pub now: Instant,
}

impl Context {
    pub fn new(request: DispatchRequest, command: Arc<Command>) -> Self {
        Self {
            request,
            command,
            now: Instant::now(),
        }
    }

    pub fn at(mut self, now: Instant) -> Self {
        self.now = now;
        self
    }
}

/// Middleware trait - checks that run before a command executes
pub trait Middleware: Send + Sync {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult;
}

/// Result of middleware processing
pub type MiddlewareResult = Result<Context, MiddlewareError>;

/// Middleware errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareError {
    /// Stop processing without telling anyone
    Blocked(String),
    /// Cooldown gate refused
    RateLimited { axis: CooldownAxis, retry_after: Duration },
    /// Permission denied
    PermissionDenied(String),
    /// Internal error
    Internal(String),
}

impl std::fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareError::Blocked(msg) => write!(f, "Blocked: {}", msg),
            MiddlewareError::RateLimited { axis, retry_after } => {
                write!(f, "Rate limited by {}, retry after {:?}", axis, retry_after)
            }
            MiddlewareError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            MiddlewareError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// Next middleware in chain
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    position: usize,
}

impl Next {
    pub fn new(chain: Arc<[Arc<dyn Middleware>]>) -> Self {
        Self { chain, position: 0 }
    }

    /// Process remaining middleware
    pub fn run(self, ctx: Context) -> MiddlewareResult {
        match self.chain.get(self.position) {
            Some(current) => {
                let next = Next {
                    chain: self.chain.clone(),
                    position: self.position + 1,
                };
                current.process(ctx, next)
            }
            // No more middleware, processing complete
            None => Ok(ctx),
        }
    }
}

/// Middleware chain builder
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Arc<[Arc<dyn Middleware>]> {
        self.middlewares.into()
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Refuses users below the command level and whispers to commands that
/// do not accept them
pub struct PermissionMiddleware;

impl Middleware for PermissionMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        if ctx.request.event.is_whisper() && !ctx.command.can_execute_with_whisper {
            return Err(MiddlewareError::Blocked(format!(
                "{} cannot be used in whispers",
                ctx.command.name
            )));
        }

        if ctx.request.source.level < ctx.command.level {
            return Err(MiddlewareError::PermissionDenied(format!(
                "{} needs level {}, {} has {}",
                ctx.command.name, ctx.command.level, ctx.request.source.login, ctx.request.source.level
            )));
        }

        next.run(ctx)
    }
}

/// Global and per-user cooldowns
pub struct CooldownMiddleware {
    gate: Arc<CooldownGate>,
}

impl CooldownMiddleware {
    pub fn new(gate: Arc<CooldownGate>) -> Self {
        Self { gate }
    }
}

impl Middleware for CooldownMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        match self
            .gate
            .check_and_arm(&ctx.command, &ctx.request.source.id, ctx.now)
        {
            CooldownDecision::Allowed => next.run(ctx),
            CooldownDecision::Denied { axis, retry_after } => {
                Err(MiddlewareError::RateLimited { axis, retry_after })
            }
        }
    }
}

/// Logging middleware for debugging
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        let name = ctx.command.name.clone();
        let login = ctx.request.source.login.clone();

        tracing::debug!("[{}] {} {}", login, name, ctx.request.message);

        let result = next.run(ctx);

        match &result {
            Ok(_) => {
                tracing::debug!("[{}] {} passed checks", login, name);
            }
            Err(e) => {
                tracing::debug!("[{}] {} refused: {}", login, name, e);
            }
        }

        result
    }
}
