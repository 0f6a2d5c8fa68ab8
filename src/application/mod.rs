//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Error taxonomy shared by every command
//! - Context: Bot handles and the per-invocation command context
//! - Executor: Deferred task queue
//! - Reply: Delivery of responses to users
//! - Services: Shared helpers used by modules
//! - Messaging: Message parsing, middleware, cooldowns, dispatching

pub mod context;
pub mod errors;
pub mod executor;
pub mod messaging;
pub mod reply;
pub mod services;
