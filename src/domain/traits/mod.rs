//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod platform;
pub mod scheduler;
pub mod store;

pub use bot::{Bot, BotInfo};
pub use platform::{CommercialOutcome, PlatformApi, SongInfoProvider};
pub use scheduler::{job_fn, JobFn, JobHandle, JobSpec, Scheduler};
pub use store::Store;
