//! Push subscriptions over the paged pull core.
//!
//! Each subscription spawns one long-running worker that pulls pages past
//! its cursor and pushes them to its observer. One worker per observer means
//! observer calls are naturally serialized; the worker's cursor only ever
//! advances, so a projector sees a gapless, duplicate-free prefix of the
//! log from its starting checkpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use tailcast_core::{Checkpoint, CommitStore, PageObserver};

use crate::PollingAdapter;
use crate::adapter::AdapterInner;
use crate::error::AdapterError;
use crate::metrics;

/// Shared bookkeeping of one subscription, owned by the adapter's set until
/// disposed.
pub(crate) struct SubscriptionState {
    pub(crate) id: u64,
    pub(crate) observer: Arc<dyn PageObserver>,
    pub(crate) cancel: CancellationToken,
    pub(crate) worker: Mutex<Option<JoinHandle<()>>>,
    pub(crate) failed: AtomicBool,
    pub(crate) disposed: AtomicBool,
}

impl SubscriptionState {
    /// Cancels the worker, awaits it, then signals completion unless the
    /// subscription already failed. Idempotent.
    pub(crate) async fn shut_down(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        let handle = self
            .worker
            .lock()
            .expect("subscription worker slot poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        if !self.failed.load(Ordering::SeqCst) {
            self.observer.on_completed().await;
        }
        debug!(subscription = self.id, "subscription completed");
    }
}

/// Handle to a live subscription.
///
/// Disposal is the explicit, idempotent [`complete`](Subscription::complete)
/// call. Dropping the handle neither cancels nor completes the
/// subscription; it stays registered and keeps delivering until the
/// adapter itself is disposed.
pub struct Subscription<S: CommitStore> {
    state: Arc<SubscriptionState>,
    adapter: Mutex<Option<Arc<AdapterInner<S>>>>,
}

impl<S: CommitStore> Subscription<S> {
    /// Returns `true` once the subscription has terminated because its
    /// observer failed.
    pub fn is_failed(&self) -> bool {
        self.state.failed.load(Ordering::SeqCst)
    }

    /// Returns `true` once the subscription has been disposed, by this
    /// handle or by the adapter.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::SeqCst)
    }

    /// Cancels the worker, awaits it, removes the subscription from the
    /// adapter, and signals `on_completed` unless the subscription failed.
    ///
    /// Idempotent; concurrent and repeated calls are no-ops after the first.
    pub async fn complete(&self) {
        self.state.shut_down().await;
        let adapter = self
            .adapter
            .lock()
            .expect("subscription back-reference lock poisoned")
            .take();
        if let Some(adapter) = adapter
            && adapter.remove_subscription(self.state.id)
        {
            metrics::record_subscription_removed();
        }
    }
}

pub(crate) fn subscribe<S: CommitStore>(
    adapter: &PollingAdapter<S>,
    from: Checkpoint,
    observer: Arc<dyn PageObserver>,
) -> Result<Subscription<S>, AdapterError> {
    let inner = &adapter.inner;
    if inner.is_disposed() {
        return Err(AdapterError::Disposed);
    }

    let id = inner.subscription_counter.fetch_add(1, Ordering::Relaxed);
    let state = Arc::new(SubscriptionState {
        id,
        observer,
        cancel: inner.shutdown.child_token(),
        worker: Mutex::new(None),
        failed: AtomicBool::new(false),
        disposed: AtomicBool::new(false),
    });

    // the worker handle must be in place before the subscription becomes
    // visible to dispose, which awaits it
    let handle = tokio::spawn(
        run_worker(adapter.clone(), Arc::clone(&state), from.clone())
            .instrument(info_span!("subscription", id, from = %from)),
    );
    *state
        .worker
        .lock()
        .expect("subscription worker slot poisoned") = Some(handle);

    {
        let mut subscriptions = inner
            .subscriptions
            .lock()
            .expect("subscription set lock poisoned");
        // re-checked under the set lock: a racing dispose either drains this
        // entry or rejects the subscription here
        if inner.is_disposed() {
            drop(subscriptions);
            state.cancel.cancel();
            return Err(AdapterError::Disposed);
        }
        subscriptions.insert(id, Arc::clone(&state));
    }
    metrics::record_subscription_registered();
    debug!(subscription = id, from = %from, "subscription registered");

    Ok(Subscription {
        state,
        adapter: Mutex::new(Some(Arc::clone(inner))),
    })
}

async fn run_worker<S: CommitStore>(
    adapter: PollingAdapter<S>,
    state: Arc<SubscriptionState>,
    mut cursor: Checkpoint,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = state.cancel.cancelled() => break,
            next = adapter.next_page(&cursor) => next,
        };

        let page = match next {
            Ok(page) => page,
            // dispose raced the loop; completion is signalled by the disposer
            Err(AdapterError::Disposed) => break,
        };
        if page.is_empty() {
            // the loader only yields an empty page once the adapter is
            // shutting down
            break;
        }

        let last = page.last_checkpoint().cloned();
        match state.observer.on_next(page.into_transactions()).await {
            Ok(()) => {
                metrics::record_page_delivered();
                if let Some(checkpoint) = last {
                    cursor = checkpoint;
                }
            }
            Err(error) => {
                warn!(
                    subscription = state.id,
                    %error,
                    "observer failed; terminating subscription"
                );
                state.failed.store(true, Ordering::SeqCst);
                state.disposed.store(true, Ordering::SeqCst);
                state.observer.on_error(error).await;
                if adapter.inner.remove_subscription(state.id) {
                    metrics::record_subscription_removed();
                }
                break;
            }
        }
    }
    debug!(subscription = state.id, "subscription worker stopped");
}
