//! Chat transports

pub mod console;

pub use console::{ConsoleAdapter, ConsoleLine, Outbound};
