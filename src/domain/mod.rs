//! Domain layer - Core business objects and collaborator seams
//!
//! This layer contains:
//! - Entities: Core business objects (User, Message, Command, Song)
//! - Traits: Abstractions for infrastructure (Bot, Store, PlatformApi, Scheduler)

pub mod entities;
pub mod traits;
