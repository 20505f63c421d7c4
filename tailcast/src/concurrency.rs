//! Single-flight load coalescing.
//!
//! At any instant, globally across one adapter, at most one fetch against
//! the commit store is in progress. Whoever finds the slot empty leads the
//! round and runs the fetch; everyone who arrives while it is occupied
//! awaits the same result, even when their cursor differs from the one the
//! round was opened for. Mismatched callers reconcile by re-entering the
//! sequential load loop, where the now-warm cache usually answers them.
//!
//! The slot is deliberately not keyed by cursor: the single invariant "one
//! load total" is what provides back-pressure on the store.

use std::sync::{Arc, Mutex};

use tailcast_core::Page;
use tokio::sync::broadcast;

/// Errors observed while awaiting a coalesced round.
#[derive(Debug, Clone)]
pub enum AwaitError {
    /// Receiver lagged behind and missed the result.
    Lagged(u64),
    /// The round ended without publishing a result.
    Closed,
}

/// Outcome of joining the single-flight slot.
pub enum Join {
    /// The slot was empty. The caller owns this round and must run the fetch
    /// (or abandon); the receiver carries the round's own result.
    Lead(broadcast::Receiver<Arc<Page>>),
    /// A round is already in flight; await its result.
    Follow(broadcast::Receiver<Arc<Page>>),
}

/// Single-slot coordinator coalescing concurrent loads onto one fetch.
#[derive(Debug, Default)]
pub struct SingleFlight {
    current: Mutex<Option<broadcast::Sender<Arc<Page>>>>,
}

impl SingleFlight {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the round in flight, or opens a new one.
    ///
    /// Subscription happens under the slot lock, so a receiver handed out
    /// here can never miss the round's result.
    pub fn join(&self) -> Join {
        let mut slot = self.current.lock().expect("flight slot lock poisoned");
        match slot.as_ref() {
            Some(sender) => Join::Follow(sender.subscribe()),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                *slot = Some(sender);
                Join::Lead(receiver)
            }
        }
    }

    /// Publishes the round's result and ends it.
    ///
    /// The sender is taken out of the slot before the result goes out, so a
    /// caller that observes the result never finds a stale round still
    /// installed.
    pub fn finish(&self, page: Arc<Page>) {
        let sender = self.current.lock().expect("flight slot lock poisoned").take();
        if let Some(sender) = sender {
            // a send error just means nobody was waiting
            let _ = sender.send(page);
        }
    }

    /// Ends the round without a result.
    ///
    /// Dropping the sender wakes waiters with [`AwaitError::Closed`]; they
    /// re-enter their load loop and the next joiner leads a fresh round.
    pub fn abandon(&self) {
        self.current.lock().expect("flight slot lock poisoned").take();
    }

    /// Returns `true` while a round is in flight.
    pub fn is_in_flight(&self) -> bool {
        self.current
            .lock()
            .expect("flight slot lock poisoned")
            .is_some()
    }
}

/// Awaits the result of a round joined via [`SingleFlight::join`].
pub async fn await_round(
    mut receiver: broadcast::Receiver<Arc<Page>>,
) -> Result<Arc<Page>, AwaitError> {
    match receiver.recv().await {
        Ok(page) => Ok(page),
        Err(broadcast::error::RecvError::Lagged(skipped)) => Err(AwaitError::Lagged(skipped)),
        Err(broadcast::error::RecvError::Closed) => Err(AwaitError::Closed),
    }
}
