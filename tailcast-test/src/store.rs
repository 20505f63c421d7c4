//! In-memory scripted commit store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use tailcast_core::{Checkpoint, Commit, CommitStore, StoreError, StoreResult};

/// The failure [`MockCommitStore`] injects when scripted to do so.
#[derive(Debug, Error)]
#[error("injected store failure")]
pub struct InjectedFailure;

/// Call counters of a [`MockCommitStore`].
#[derive(Debug, Default)]
pub struct StoreCounters {
    pub fetch_count: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub dispose_count: AtomicUsize,
}

impl StoreCounters {
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently running fetches ever observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }
}

// Decrements the in-flight gauge even when a fetch future is dropped
// mid-gate.
struct InFlightGuard<'a>(&'a StoreCounters);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An in-memory, scripted [`CommitStore`].
///
/// The log is an ordered list of commits; `get_from` serves everything
/// strictly after the given checkpoint. Tests can append commits while the
/// store is live, close the gate to hold fetches open, and script failures
/// for upcoming fetches.
#[derive(Debug, Clone)]
pub struct MockCommitStore {
    log: Arc<Mutex<Vec<Commit>>>,
    counters: Arc<StoreCounters>,
    calls: Arc<Mutex<Vec<(Checkpoint, Instant)>>>,
    fail_next: Arc<AtomicUsize>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for MockCommitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCommitStore {
    /// Creates a store with an empty log.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(StoreCounters::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(gate),
        }
    }

    /// Creates a store whose log already contains `commits`.
    pub fn with_log(commits: Vec<Commit>) -> Self {
        let store = Self::new();
        store.extend(commits);
        store
    }

    /// Appends one commit to the log.
    pub fn append(&self, commit: Commit) {
        self.log.lock().expect("mock log lock poisoned").push(commit);
    }

    /// Appends several commits to the log.
    pub fn extend(&self, commits: impl IntoIterator<Item = Commit>) {
        self.log
            .lock()
            .expect("mock log lock poisoned")
            .extend(commits);
    }

    /// The store's counters.
    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }

    /// Cursor and issue time of every `get_from` call, in call order.
    pub fn calls(&self) -> Vec<(Checkpoint, Instant)> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    /// Number of `get_from` calls issued so far.
    pub fn fetch_count(&self) -> usize {
        self.counters.fetch_count()
    }

    /// Scripts the next `count` fetches to fail with [`InjectedFailure`].
    pub fn fail_next_fetches(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Holds every subsequent fetch open until [`open_gate`] is called.
    ///
    /// [`open_gate`]: MockCommitStore::open_gate
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    /// Releases fetches held by [`close_gate`](MockCommitStore::close_gate).
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    fn commits_after(&self, checkpoint: &Checkpoint) -> Vec<Commit> {
        let log = self.log.lock().expect("mock log lock poisoned");
        let start = if checkpoint.is_origin() {
            0
        } else {
            match log
                .iter()
                .position(|commit| commit.checkpoint_token == *checkpoint)
            {
                Some(position) => position + 1,
                None => return Vec::new(),
            }
        };
        log[start..].to_vec()
    }
}

#[async_trait]
impl CommitStore for MockCommitStore {
    async fn get_from(&self, checkpoint: &Checkpoint) -> StoreResult<Vec<Commit>> {
        let running = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_in_flight
            .fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.counters);

        self.counters.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push((checkpoint.clone(), Instant::now()));

        let mut open = self.gate.subscribe();
        open.wait_for(|open| *open)
            .await
            .expect("gate sender lives in the store");

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .fail_next
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(StoreError::Internal(Box::new(InjectedFailure)));
        }

        Ok(self.commits_after(checkpoint))
    }

    async fn dispose(&self) {
        self.counters.dispose_count.fetch_add(1, Ordering::SeqCst);
    }
}
