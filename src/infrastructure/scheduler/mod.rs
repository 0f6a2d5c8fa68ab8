//! Recurring jobs backed by tokio-cron-scheduler

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::errors::BotError;
use crate::domain::traits::{JobFn, JobHandle, JobSpec, Scheduler};

fn scheduler_error(what: &str, e: JobSchedulerError) -> BotError {
    BotError::Unexpected(format!("{}: {}", what, e))
}

/// Wall-clock jobs run from cron expressions in UTC, intervals as repeated jobs.
/// Cancelling removes the job; a run already in progress finishes on its own.
pub struct CronScheduler {
    inner: JobScheduler,
    /// Job names by id, for jobs not yet cancelled
    jobs: Mutex<HashMap<Uuid, String>>,
}

impl CronScheduler {
    /// Create and start the scheduler. Must be called from inside a tokio runtime.
    pub async fn new() -> Result<Self, BotError> {
        let inner = JobScheduler::new()
            .await
            .map_err(|e| scheduler_error("Failed to create job scheduler", e))?;
        inner
            .start()
            .await
            .map_err(|e| scheduler_error("Failed to start job scheduler", e))?;
        debug!("Job scheduler started");

        Ok(Self {
            inner,
            jobs: Mutex::new(HashMap::new()),
        })
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Uuid, String>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stop firing jobs altogether
    pub async fn shutdown(&self) -> Result<(), BotError> {
        self.jobs().clear();
        let mut inner = self.inner.clone();
        inner
            .shutdown()
            .await
            .map_err(|e| scheduler_error("Failed to shut down job scheduler", e))
    }
}

fn build_job(name: &str, spec: JobSpec, job: JobFn) -> Result<Job, JobSchedulerError> {
    let name = name.to_string();
    let run = move |_id, _scheduler| {
        let future = job();
        let name = name.clone();
        Box::pin(async move {
            // Spawned so a panicking run is reported instead of taking the ticker down
            match tokio::spawn(future).await {
                Ok(Ok(())) => debug!("Job '{}' finished", name),
                Ok(Err(e)) => warn!("Job '{}' failed: {}", name, e),
                Err(e) => error!("Job '{}' panicked: {}", name, e),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    };

    match spec {
        JobSpec::Every(interval) => Job::new_repeated_async(interval, run),
        _ => {
            let cron = spec.cron().unwrap_or_default();
            Job::new_async(cron.as_str(), run)
        }
    }
}

#[async_trait]
impl Scheduler for CronScheduler {
    async fn schedule(&self, name: &str, spec: JobSpec, job: JobFn) -> Result<JobHandle, BotError> {
        spec.validate()?;

        let job = build_job(name, spec, job)
            .map_err(|e| scheduler_error(&format!("Invalid schedule for '{}'", name), e))?;
        let id = self
            .inner
            .add(job)
            .await
            .map_err(|e| scheduler_error(&format!("Failed to add job '{}'", name), e))?;

        info!("Scheduled job '{}' ({:?})", name, spec);
        self.jobs().insert(id, name.to_string());
        Ok(JobHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn cancel(&self, handle: &JobHandle) -> bool {
        if self.jobs().remove(&handle.id).is_none() {
            return false;
        }
        if let Err(e) = self.inner.remove(&handle.id).await {
            error!("Failed to remove job '{}': {}", handle.name, e);
        }
        info!("Cancelled job '{}'", handle.name);
        true
    }

    async fn active_jobs(&self) -> usize {
        self.jobs().len()
    }
}
