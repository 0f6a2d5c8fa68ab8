//! Message handling - Command parsing, checks and dispatching

pub mod cooldown;
pub mod dispatcher;
pub mod middleware;
pub mod parser;

pub use cooldown::{CooldownDecision, CooldownGate};
pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use middleware::{DispatchRequest, Middleware, MiddlewareChain, MiddlewareError};
pub use parser::MessageParser;
