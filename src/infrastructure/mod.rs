//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite store
//! - Twitch: Helix API client
//! - Scheduler: Recurring jobs on tokio timers
//! - Adapters: Chat transports

pub mod adapters;
pub mod config;
pub mod database;
pub mod scheduler;
pub mod twitch;
