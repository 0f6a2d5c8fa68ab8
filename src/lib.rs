//! chatmod-bot - a chat command framework for live-stream channels
//!
//! Commands are resolved by the registry, gated by permission and cooldown
//! checks, and either run inline or handed to the action queue. Feature
//! modules own their commands and recurring jobs and can be toggled at
//! runtime.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod modules;
