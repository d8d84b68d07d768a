use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;

use crate::shared::config::ExecutionPolicy;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("detection queue is full")]
    QueueFull,
    #[error("detection workers have shut down")]
    Disconnected,
    #[error("failed to spawn detection thread: {0}")]
    Spawn(String),
}

/// Moves a detection job off the calling thread.
///
/// `execute` never blocks. A job it rejects has not run and will not run.
pub trait RequestExecutor: Send + Sync {
    fn execute(&self, job: Job) -> Result<(), ExecutorError>;
}

pub fn for_policy(policy: ExecutionPolicy) -> Box<dyn RequestExecutor> {
    match policy {
        ExecutionPolicy::Detached => Box::new(DetachedExecutor),
        ExecutionPolicy::Pooled {
            workers,
            queue_capacity,
        } => Box::new(PooledExecutor::new(workers, queue_capacity)),
    }
}

/// One detached thread per job.
pub struct DetachedExecutor;

impl RequestExecutor for DetachedExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        thread::Builder::new()
            .name("facebridge-detect".into())
            .spawn(job)
            .map(|_| ())
            .map_err(|e| ExecutorError::Spawn(e.to_string()))
    }
}

/// Fixed workers draining a bounded queue.
///
/// Workers exit once the executor is dropped and the queue is drained.
pub struct PooledExecutor {
    tx: Sender<Job>,
}

impl PooledExecutor {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = crossbeam_channel::bounded::<Job>(queue_capacity);
        for i in 0..workers {
            let rx = rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("facebridge-worker-{i}"))
                .spawn(move || {
                    for job in rx {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            log::warn!("Detection job panicked on worker {i}");
                        }
                    }
                });
            if let Err(e) = spawned {
                log::warn!("Failed to spawn detection worker {i}: {e}");
            }
        }
        Self { tx }
    }
}

impl RequestExecutor for PooledExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => ExecutorError::QueueFull,
            TrySendError::Disconnected(_) => ExecutorError::Disconnected,
        })
    }
}
