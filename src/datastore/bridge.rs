//! Bridge from async callers to blocking drivers.
//!
//! Blocking calls run on the runtime's blocking-thread pool behind a
//! semaphore, so at most `size` driver calls are in flight process-wide.
//! The caller's task is suspended, not blocked, until the call returns.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::error::{DatastoreError, Result};

/// Environment variable sizing the process-wide pool.
pub const WORKERS_ENV: &str = "RETRIEVAL_WORKERS";

pub const DEFAULT_WORKERS: usize = 8;

static GLOBAL: Lazy<WorkerPool> = Lazy::new(|| WorkerPool::new(workers_from_env()));

/// The process-wide worker pool shared by every blocking backend.
pub fn global() -> &'static WorkerPool {
    &GLOBAL
}

fn workers_from_env() -> usize {
    match std::env::var(WORKERS_ENV) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(size) if size > 0 => size,
            _ => {
                warn!(%value, "Invalid {}, using {}", WORKERS_ENV, DEFAULT_WORKERS);
                DEFAULT_WORKERS
            }
        },
        Err(_) => DEFAULT_WORKERS,
    }
}

/// Bounded pool of blocking workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool allowing `size` concurrent blocking calls (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of idle workers.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `f` on a blocking worker and resolves with its result.
    ///
    /// Once `f` has been handed to a worker it runs to completion even if
    /// the returned future is dropped; its result is then discarded and its
    /// permit released when it returns. A panic in `f` surfaces as
    /// [`DatastoreError::Worker`].
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DatastoreError::Worker("worker pool is shut down".into()))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        });

        handle.await.map_err(join_error)?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

fn join_error(err: JoinError) -> DatastoreError {
    if err.is_panic() {
        let message = panic_message(err.into_panic());
        debug!(%message, "Blocking worker panicked");
        DatastoreError::Worker(format!("blocking call panicked: {}", message))
    } else {
        DatastoreError::Worker(err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
