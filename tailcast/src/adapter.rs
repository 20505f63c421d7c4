//! The polling adapter: page assembly, sequential loading, lifecycle.
//!
//! [`PollingAdapter`] fronts a [`CommitStore`] with the paged loader core:
//! a cache fast path over the checkpoint cache, a sequential slow path that
//! coalesces every concurrent caller onto one single-flight fetch, preloads
//! fired when a chain goes cold or a page comes back full, and tail-poll
//! throttling once a fetch has seen the end of the log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tailcast_core::{Checkpoint, CommitStore, Page, PageObserver, Transaction};

use crate::cache::CheckpointCache;
use crate::concurrency::{self, Join, SingleFlight};
use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::metrics;
use crate::offload::OffloadPool;
use crate::subscription::{self, Subscription, SubscriptionState};
use crate::tail::TailTracker;

/// Push-based, paged, cache-coalesced front for a [`CommitStore`].
///
/// All clones share one adapter: one checkpoint cache, one single-flight
/// slot, one tail observation, one subscription set. Cloning is cheap and
/// the adapter is safe to use from any number of tasks.
///
/// - [`next_page`](Self::next_page) is the pull surface. It resolves once a
///   non-empty page past the cursor exists (or the adapter is disposed) and
///   never issues more than one concurrent fetch against the store, no
///   matter how many callers race it.
/// - [`subscribe`](Self::subscribe) is the push surface: a long-running
///   worker per observer that pulls pages and delivers them in order.
/// - [`dispose`](Self::dispose) shuts everything down in order and releases
///   the store.
pub struct PollingAdapter<S: CommitStore> {
    pub(crate) inner: Arc<AdapterInner<S>>,
}

impl<S: CommitStore> Clone for PollingAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct AdapterInner<S> {
    pub(crate) store: S,
    pub(crate) config: AdapterConfig,
    pub(crate) cache: CheckpointCache,
    pub(crate) tail: TailTracker,
    pub(crate) flight: SingleFlight,
    pub(crate) offload: OffloadPool,
    pub(crate) subscriptions: Mutex<HashMap<u64, Arc<SubscriptionState>>>,
    pub(crate) subscription_counter: AtomicU64,
    pub(crate) disposed: AtomicBool,
    dispose_lock: tokio::sync::Mutex<()>,
    pub(crate) shutdown: CancellationToken,
}

impl<S: CommitStore> AdapterInner<S> {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn page_capacity(&self) -> usize {
        self.config.max_page_size.get() as usize
    }

    /// Removes `id` from the subscription set; `true` when it was present.
    pub(crate) fn remove_subscription(&self, id: u64) -> bool {
        self.subscriptions
            .lock()
            .expect("subscription set lock poisoned")
            .remove(&id)
            .is_some()
    }
}

impl<S: CommitStore> PollingAdapter<S> {
    /// Creates an adapter over `store` with the given configuration.
    pub fn new(store: S, config: AdapterConfig) -> Self {
        let cache = CheckpointCache::new(config.cache_size);
        Self {
            inner: Arc::new(AdapterInner {
                store,
                config,
                cache,
                tail: TailTracker::new(),
                flight: SingleFlight::new(),
                offload: OffloadPool::new(),
                subscriptions: Mutex::new(HashMap::new()),
                subscription_counter: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                dispose_lock: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Creates an adapter over `store` with [`AdapterConfig::default`].
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, AdapterConfig::default())
    }

    /// Returns `true` once [`dispose`](Self::dispose) has begun.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// The adapter's configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    /// Resolves the next page of transactions strictly past `cursor`.
    ///
    /// Serves from the checkpoint cache when the successor chain is warm;
    /// otherwise joins the single-flight slow path and loops until a
    /// non-empty page answering `cursor` exists. At the tail of the log this
    /// suspends on the poll-interval throttle, so the returned page is
    /// non-empty except when the adapter is disposed mid-call.
    pub async fn next_page(&self, cursor: &Checkpoint) -> Result<Page, AdapterError> {
        if self.inner.is_disposed() {
            return Err(AdapterError::Disposed);
        }

        let page = self.page_from_cache(cursor);
        if !page.is_empty() {
            metrics::record_page_cache_hit();
            return Ok(page);
        }

        let page = self.load_next_page_sequentially(cursor).await;
        if page.len() == self.inner.page_capacity()
            && let Some(last) = page.last_checkpoint()
        {
            // a full page means the log continues; start on the next one
            self.kick_load(last.clone());
        }
        Ok(page)
    }

    /// Opens a push subscription delivering every page past `from`, in
    /// order, to `observer`.
    ///
    /// The returned handle disposes the subscription via
    /// [`Subscription::complete`]; dropping it without completing leaves the
    /// subscription running until the adapter is disposed.
    pub fn subscribe(
        &self,
        from: Checkpoint,
        observer: impl PageObserver,
    ) -> Result<Subscription<S>, AdapterError> {
        subscription::subscribe(self, from, Arc::new(observer))
    }

    /// Shuts the adapter down.
    ///
    /// Serialized and idempotent: flips the disposed flag, cancels every
    /// subscription and awaits its worker, waits out any in-flight load and
    /// preload, then releases the store. Calls after the first are no-ops.
    pub async fn dispose(&self) {
        let _guard = self.inner.dispose_lock.lock().await;
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("disposing adapter");
        self.inner.shutdown.cancel();

        let states: Vec<Arc<SubscriptionState>> = {
            let mut subscriptions = self
                .inner
                .subscriptions
                .lock()
                .expect("subscription set lock poisoned");
            subscriptions.drain().map(|(_, state)| state).collect()
        };
        join_all(states.iter().map(|state| state.shut_down())).await;
        for _ in &states {
            metrics::record_subscription_removed();
        }

        self.inner.offload.wait_all().await;
        self.inner.store.dispose().await;
        debug!("adapter disposed");
    }

    /// Cache fast path: walk the successor chain from `cursor`.
    ///
    /// Stops at the page bound or at the first cold link; a cold link fires
    /// a preload for the chain's continuation.
    fn page_from_cache(&self, cursor: &Checkpoint) -> Page {
        let Some(first) = self.inner.cache.try_get(cursor) else {
            return Page::empty(cursor.clone());
        };

        let capacity = self.inner.page_capacity();
        let mut next_key = first.checkpoint.clone();
        let mut transactions = vec![first];
        while transactions.len() < capacity {
            match self.inner.cache.try_get(&next_key) {
                Some(tx) => {
                    next_key = tx.checkpoint.clone();
                    transactions.push(tx);
                }
                None => {
                    self.kick_load(next_key);
                    break;
                }
            }
        }
        Page::new(cursor.clone(), transactions)
    }

    /// Fire-and-forget load for `cursor`.
    ///
    /// A round finding the slot occupied does not start a second fetch; the
    /// load in flight will warm the cache either way. A cursor inside its
    /// tail-poll window is skipped rather than waited out: preloads are
    /// advisory, and the slot must not sit occupied through a sleep.
    fn kick_load(&self, cursor: Checkpoint) {
        if self
            .inner
            .tail
            .is_throttled(&cursor, self.inner.config.poll_interval)
        {
            return;
        }
        match self.inner.flight.join() {
            Join::Follow(_) => {}
            Join::Lead(_receiver) => {
                metrics::record_preload();
                debug!(checkpoint = %cursor, "preloading next page");
                self.spawn_fetch(cursor);
            }
        }
    }

    /// Runs the fetch of a led round on a detached task.
    ///
    /// The round's waiters may outlive the caller, so the fetch must not die
    /// with it; cancellation of whoever led the round leaves the load (and
    /// the slot hand-off in `finish`) untouched.
    fn spawn_fetch(&self, cursor: Checkpoint) {
        let adapter = self.clone();
        self.inner.offload.spawn("load", async move {
            // the round must end with a finish either way; an abandoned
            // round would strand its followers until they observe Closed
            let page = if adapter.inner.is_disposed() {
                Page::empty(cursor.clone())
            } else {
                adapter.try_load_next_page(&cursor).await
            };
            adapter.inner.flight.finish(Arc::new(page));
        });
    }

    /// Slow path: loop until a round yields a non-empty page answering
    /// `cursor`.
    ///
    /// Each pass throttles at the tail, then either leads a fresh
    /// single-flight round or awaits the one in flight. A result for a
    /// different cursor, an empty result, and an abandoned round all
    /// re-enter the loop: by then the cache is warm for this cursor or this
    /// caller becomes the next leader, so every pass makes progress.
    async fn load_next_page_sequentially(&self, cursor: &Checkpoint) -> Page {
        loop {
            if self.inner.is_disposed() {
                return Page::empty(cursor.clone());
            }
            self.inner
                .tail
                .wait_if_at(cursor, self.inner.config.poll_interval)
                .await;

            let round = match self.inner.flight.join() {
                Join::Lead(receiver) => {
                    if self.inner.is_disposed() {
                        self.inner.flight.abandon();
                        return Page::empty(cursor.clone());
                    }
                    self.spawn_fetch(cursor.clone());
                    concurrency::await_round(receiver).await
                }
                Join::Follow(receiver) => concurrency::await_round(receiver).await,
            };

            match round {
                Ok(page) if page.answers(cursor) => return (*page).clone(),
                Ok(_) | Err(_) => continue,
            }
        }
    }

    /// One fetch against the store, executed by the round's leader.
    async fn try_load_next_page(&self, cursor: &Checkpoint) -> Page {
        // a coalesced writer may have warmed the cache while this round
        // queued behind the previous one
        let cached = self.page_from_cache(cursor);
        if !cached.is_empty() {
            return cached;
        }

        let time_of_request = Utc::now();
        metrics::record_store_poll();
        let mut commits = match self.inner.store.get_from(cursor).await {
            Ok(commits) => commits,
            Err(error) => {
                // reported as empty so the sequential loop retries on the
                // poll cadence instead of surfacing a transient error
                warn!(%error, checkpoint = %cursor, "commit store fetch failed");
                metrics::record_store_poll_failure();
                Vec::new()
            }
        };
        commits.truncate(self.inner.page_capacity());
        let transactions: Vec<Transaction> = commits.into_iter().map(Transaction::from).collect();

        if transactions.len() < self.inner.page_capacity() {
            let tail_checkpoint = transactions
                .last()
                .map(|tx| tx.checkpoint.clone())
                .unwrap_or_else(|| cursor.clone());
            self.inner.tail.record(tail_checkpoint, time_of_request);
        }

        self.populate_cache(cursor, &transactions);
        debug!(
            checkpoint = %cursor,
            count = transactions.len(),
            "fetched page from commit store"
        );
        Page::new(cursor.clone(), transactions)
    }

    /// Installs a fetched batch into the cache, tail first.
    ///
    /// A reader that finds the batch's head must find every successor of the
    /// same batch already present, so the head entry goes in last.
    fn populate_cache(&self, cursor: &Checkpoint, transactions: &[Transaction]) {
        for i in (1..transactions.len()).rev() {
            self.inner
                .cache
                .insert(transactions[i - 1].checkpoint.clone(), transactions[i].clone());
        }
        if let Some(first) = transactions.first() {
            self.inner.cache.insert(cursor.clone(), first.clone());
        }
    }
}
