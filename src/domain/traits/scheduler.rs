use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::errors::{BotError, ConfigError};

/// Future produced by one run of a recurring job
pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), BotError>> + Send>>;

/// Body of a recurring job, invoked once per firing
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Wrap an async closure as a [`JobFn`]
pub fn job_fn<F, Fut>(f: F) -> JobFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as JobFuture)
}

/// When a recurring job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSpec {
    /// Fixed interval, first run one interval after scheduling
    Every(Duration),
    /// Every hour at `minute` past
    HourlyAt { minute: u32 },
    /// Every day at `hour:minute` UTC
    DailyAt { hour: u32, minute: u32 },
}

impl JobSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            JobSpec::Every(interval) if interval.is_zero() => {
                Err(ConfigError::invalid("interval", "must be greater than zero"))
            }
            JobSpec::HourlyAt { minute } | JobSpec::DailyAt { minute, .. } if minute > 59 => {
                Err(ConfigError::invalid("minute", format!("{} is not in 0..=59", minute)))
            }
            JobSpec::DailyAt { hour, .. } if hour > 23 => {
                Err(ConfigError::invalid("hour", format!("{} is not in 0..=23", hour)))
            }
            _ => Ok(()),
        }
    }

    /// Six-field cron expression (seconds first, UTC) for wall-clock specs.
    /// `None` for fixed intervals.
    pub fn cron(&self) -> Option<String> {
        match *self {
            JobSpec::Every(_) => None,
            JobSpec::HourlyAt { minute } => Some(format!("0 {} * * * *", minute)),
            JobSpec::DailyAt { hour, minute } => Some(format!("0 {} {} * * *", minute, hour)),
        }
    }
}

/// Handle to a registered job, used to cancel it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: uuid::Uuid,
    pub name: String,
}

/// Scheduler trait - recurring job registration
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(&self, name: &str, spec: JobSpec, job: JobFn) -> Result<JobHandle, BotError>;

    /// Cancel a job. Returns false when the handle was already cancelled.
    async fn cancel(&self, handle: &JobHandle) -> bool;

    async fn active_jobs(&self) -> usize;
}
