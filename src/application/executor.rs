//! Action queue - runs slow work off the message ingestion path
//!
//! Tasks are routed to a worker by key, so everything submitted under the
//! same key (the dispatcher uses the command name) runs first-in-first-out.
//! Different keys may run in parallel on different workers.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::errors::BotError;

/// Boxed body of a deferred task
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), BotError>> + Send>>;

struct Task {
    name: String,
    future: TaskFuture,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

struct Inner {
    senders: RwLock<Vec<mpsc::UnboundedSender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

/// Worker pool draining per-worker FIFO queues
#[derive(Clone)]
pub struct ActionQueue {
    inner: Arc<Inner>,
}

impl ActionQueue {
    /// Start `workers` workers (at least one). Must be called inside a tokio runtime.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let counters = Arc::new(Counters::default());
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            handles.push(tokio::spawn(run_worker(index, rx, counters.clone())));
        }

        info!("Action queue started with {} workers", workers);

        Self {
            inner: Arc::new(Inner {
                senders: RwLock::new(senders),
                workers: Mutex::new(handles),
                counters,
            }),
        }
    }

    /// Queue a task and return immediately.
    ///
    /// Errors only when the queue has been shut down.
    pub fn submit<F>(&self, key: &str, name: impl Into<String>, future: F) -> Result<(), BotError>
    where
        F: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let task = Task {
            name: name.into(),
            future: Box::pin(future),
        };

        let senders = self.inner.senders.read().unwrap_or_else(|e| e.into_inner());
        if senders.is_empty() {
            return Err(BotError::Unexpected(format!(
                "action queue is closed, dropped task '{}'",
                task.name
            )));
        }

        let index = worker_for(key, senders.len());
        debug!("Queueing task '{}' on worker {}", task.name, index);
        self.inner.counters.submitted.fetch_add(1, Ordering::SeqCst);
        senders[index].send(task).map_err(|e| {
            self.inner.counters.submitted.fetch_sub(1, Ordering::SeqCst);
            BotError::Unexpected(format!("worker {} is gone, dropped task '{}'", index, e.0.name))
        })
    }

    /// Run a task right away on the caller, propagating its failure
    pub async fn run_now<F, T>(&self, future: F) -> Result<T, BotError>
    where
        F: Future<Output = Result<T, BotError>>,
    {
        future.await
    }

    /// Stop accepting tasks, drain what is queued and wait for the workers
    pub async fn shutdown(&self) {
        self.inner
            .senders
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        let handles: Vec<JoinHandle<()>> = self.inner.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Action queue worker ended abnormally: {}", e);
            }
        }
        info!(
            "Action queue stopped ({} completed, {} failed)",
            self.completed(),
            self.failed()
        );
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .senders
            .read()
            .map(|s| s.is_empty())
            .unwrap_or(true)
    }

    pub fn completed(&self) -> u64 {
        self.inner.counters.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.inner.counters.failed.load(Ordering::SeqCst)
    }

    /// Tasks queued or running
    pub fn pending(&self) -> u64 {
        let submitted = self.inner.counters.submitted.load(Ordering::SeqCst);
        submitted.saturating_sub(self.completed() + self.failed())
    }

    /// Wait until nothing is queued or running, including tasks queued by
    /// other tasks. Gives up after `timeout`; returns whether the queue went idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.pending() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }
}

fn worker_for(key: &str, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % workers as u64) as usize
}

async fn run_worker(index: usize, mut rx: mpsc::UnboundedReceiver<Task>, counters: Arc<Counters>) {
    debug!("Action queue worker {} started", index);

    while let Some(task) = rx.recv().await {
        // Spawned so a panic inside the task is contained to its JoinHandle
        match tokio::spawn(task.future).await {
            Ok(Ok(())) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
                debug!("Task '{}' completed", task.name);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!("Task '{}' failed: {}", task.name, e);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!("Task '{}' panicked: {}", task.name, e);
            }
        }
    }

    debug!("Action queue worker {} stopped", index);
}
