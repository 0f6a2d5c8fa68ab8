//! Feature modules for chatmod-bot
//!
//! Each module owns a set of commands and recurring jobs and can be
//! switched on and off at runtime.

pub mod auto_ads;
pub mod followage;
pub mod manager;
pub mod masspoints;
pub mod settings;
pub mod songrequest;
pub mod trait_def;

pub use auto_ads::{AdsSettings, AutoAdsModule};
pub use followage::{FollowAgeModule, FollowAgeSettings};
pub use manager::{ModuleInfo, ModuleManager};
pub use masspoints::{MassPointsModule, MassPointsSettings};
pub use songrequest::{SongRequestModule, SongRequestSettings};
pub use trait_def::{Module, ModuleContext, ModuleState};
