//! Message dispatcher - Routes chat messages to command handlers

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::middleware::{
    Context, CooldownMiddleware, DispatchRequest, LoggingMiddleware, Middleware, MiddlewareChain,
    MiddlewareError, Next, PermissionMiddleware,
};
use super::parser::MessageParser;
use crate::application::context::{BotContext, CommandContext};
use crate::application::errors::BotError;
use crate::application::reply::MessageAction;
use crate::domain::entities::{Command, CommandRegistry, Execution, Message, User};

/// Queue key for activity bookkeeping
const ACTIVITY_KEY: &str = "activity";

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command
    Ignored,
    /// Looked like a command but nothing is registered under that name
    UnknownCommand(String),
    /// A pre-execution check refused the invocation
    Refused(MiddlewareError),
    /// Ran inline and finished
    Completed,
    /// Submitted to the action queue
    Deferred,
}

/// Message dispatcher - routes messages through middleware to handlers
pub struct MessageDispatcher {
    parser: MessageParser,
    registry: Arc<CommandRegistry>,
    middleware: Arc<[Arc<dyn Middleware>]>,
    bot: Arc<BotContext>,
}

impl MessageDispatcher {
    pub fn new(bot: Arc<BotContext>, registry: Arc<CommandRegistry>) -> Self {
        let middleware = MiddlewareChain::new()
            .add(LoggingMiddleware)
            .add(PermissionMiddleware)
            .add(CooldownMiddleware::new(registry.cooldowns().clone()))
            .build();

        Self {
            parser: MessageParser::new(registry.trigger()),
            registry,
            middleware,
            bot,
        }
    }

    /// Replace the middleware chain
    pub fn with_middleware(mut self, chain: MiddlewareChain) -> Self {
        self.middleware = chain.build();
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn bot(&self) -> &Arc<BotContext> {
        &self.bot
    }

    /// Handle one inbound message.
    ///
    /// Never awaits network or storage work for deferred commands.
    pub async fn process(&self, message: Message) -> Result<DispatchOutcome, BotError> {
        self.record_activity(&message);

        let Some(parsed) = self.parser.parse(&message.text) else {
            return Ok(DispatchOutcome::Ignored);
        };

        let Some(command) = self.registry.resolve(&parsed.trigger) else {
            debug!("No command registered for {}", parsed.trigger);
            return Ok(DispatchOutcome::UnknownCommand(parsed.trigger));
        };

        let method = if message.is_whisper() {
            MessageAction::Whisper
        } else {
            MessageAction::Say
        };

        let request = DispatchRequest {
            source: message.sender.clone(),
            message: parsed.args,
            event: message,
            method,
        };
        let refused_with = (command.clone(), request.source.clone());

        let ctx = match Next::new(self.middleware.clone()).run(Context::new(request, command)) {
            Ok(ctx) => ctx,
            Err(e) => {
                let (command, source) = refused_with;
                self.on_refused(&command, &source, &e);
                return Ok(DispatchOutcome::Refused(e));
            }
        };

        let Context { request, command, .. } = ctx;
        let command_ctx = CommandContext {
            bot: self.bot.clone(),
            source: request.source,
            message: request.message,
            event: request.event,
            method: request.method,
            command: command.name.clone(),
        };

        match command.execution {
            Execution::Inline => {
                execute(command, command_ctx).await?;
                Ok(DispatchOutcome::Completed)
            }
            Execution::Deferred => {
                let key = command.name.clone();
                let name = format!("{}{}", self.parser.trigger(), key);
                self.bot.actions.submit(&key, name, execute(command, command_ctx))?;
                Ok(DispatchOutcome::Deferred)
            }
        }
    }

    /// Mark the sender active, off the ingestion path
    fn record_activity(&self, message: &Message) {
        let store = self.bot.store.clone();
        let user = message.sender.clone();
        let at = message.timestamp;
        let submitted = self.bot.actions.submit(ACTIVITY_KEY, "touch user", async move {
            store.touch_user(&user, at).await?;
            Ok(())
        });
        if let Err(e) = submitted {
            warn!("Could not record activity: {}", e);
        }
    }

    fn on_refused(&self, command: &Command, source: &User, err: &MiddlewareError) {
        match err {
            MiddlewareError::Internal(msg) => error!("Dispatch failed: {}", msg),
            MiddlewareError::PermissionDenied(msg) => info!("Refused: {}", msg),
            MiddlewareError::RateLimited { axis, retry_after } if command.notify_on_cooldown => {
                let notice = BotError::RateLimited {
                    axis: *axis,
                    retry_after: *retry_after,
                };
                if let Some(text) = notice.user_message() {
                    let replies = self.bot.replies.clone();
                    let source = source.clone();
                    let submitted = self.bot.actions.submit(&command.name, "cooldown notice", async move {
                        replies.whisper(&source, &text).await
                    });
                    if let Err(e) = submitted {
                        warn!("Could not queue cooldown notice: {}", e);
                    }
                }
            }
            _ => debug!("Refused: {}", err),
        }
    }
}

/// Charge the command's cost, run its handler and report user-facing failures.
///
/// A handler that refuses the request gets the cost refunded.
pub async fn execute(command: Arc<Command>, ctx: CommandContext) -> Result<(), BotError> {
    if command.cost > 0 {
        let charged = ctx.bot.store.charge_points(&ctx.source.id, command.cost).await?;
        if !charged {
            let points = ctx
                .bot
                .store
                .get_user(&ctx.source.id)
                .await?
                .map(|u| u.points)
                .unwrap_or(0);
            info!(
                "{} cannot afford {} ({} points, has {})",
                ctx.source.login, command.name, command.cost, points
            );
            let text = format!(
                "You do not have the required {} points to execute this command. (You have {} points)",
                command.cost, points
            );
            ctx.respond_with(&text, MessageAction::Whisper).await?;
            return Ok(());
        }
    }

    match command.handler.handle(ctx.clone()).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if matches!(e, BotError::Refused(_)) && command.cost > 0 {
                ctx.bot.store.refund_points(&ctx.source.id, command.cost).await?;
                debug!("Refunded {} points to {}", command.cost, ctx.source.login);
            }
            report_failure(&command.name, &ctx, e).await
        }
    }
}

/// Whisper the user-facing text of a failure, or hand back errors users should not see
pub async fn report_failure(command: &str, ctx: &CommandContext, err: BotError) -> Result<(), BotError> {
    match &err {
        BotError::UpstreamUnavailable(_) | BotError::Config(_) => {
            warn!("{} aborted for {}: {}", command, ctx.source.login, err)
        }
        BotError::PermissionDenied(_) => info!("{} for {}: {}", command, ctx.source.login, err),
        _ => debug!("{} for {}: {}", command, ctx.source.login, err),
    }

    match err.user_message() {
        Some(text) => ctx.respond_with(&text, MessageAction::Whisper).await,
        None => Err(err),
    }
}
