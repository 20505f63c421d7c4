//! Background task offloading.
//!
//! Fetches and preloads run on detached tasks so that cancelling the caller
//! that happened to lead a round never kills a load other callers are
//! waiting on. The pool tracks every spawned task; [`OffloadPool::wait_all`]
//! is the cooperative drain shutdown uses before releasing the store.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span};

#[derive(Debug, Default)]
struct OffloadPoolInner {
    tasks: DashMap<u64, JoinHandle<()>>,
    task_counter: AtomicU64,
}

/// Tracker for the adapter's background tasks.
///
/// Tasks remove themselves from the pool on completion.
#[derive(Clone, Debug, Default)]
pub struct OffloadPool {
    inner: Arc<OffloadPoolInner>,
}

impl OffloadPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` in the background.
    ///
    /// `kind` labels the task's tracing span.
    pub fn spawn<F>(&self, kind: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.task_counter.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("offload_task", kind, id);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(
            async move {
                task.await;
                inner.tasks.remove(&id);
            }
            .instrument(span),
        );
        self.inner.tasks.insert(id, handle);
    }

    /// Number of tracked tasks that have not finished.
    pub fn active_task_count(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|entry| !entry.is_finished())
            .count()
    }

    /// Waits for every tracked task to complete.
    ///
    /// Polls with a yield between checks; a task that finished before its
    /// handle landed in the map is reaped here as well.
    pub async fn wait_all(&self) {
        loop {
            self.inner.tasks.retain(|_, handle| !handle.is_finished());
            if self.inner.tasks.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }
}
