//! Collecting page observer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use tailcast_core::{ObserverError, PageObserver, Transaction};

/// The failure [`CollectingObserver`] injects when scripted to do so.
#[derive(Debug, Error)]
#[error("injected observer failure")]
pub struct RejectedDelivery;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    pages: usize,
    transactions: usize,
    errors: usize,
    completions: usize,
}

/// A [`PageObserver`] that records everything it is handed.
///
/// Tests clone the observer (all clones share state), hand it to
/// `subscribe`, and await progress with [`wait_for_pages`],
/// [`wait_for_error`], or [`wait_for_completion`].
///
/// [`wait_for_pages`]: CollectingObserver::wait_for_pages
/// [`wait_for_error`]: CollectingObserver::wait_for_error
/// [`wait_for_completion`]: CollectingObserver::wait_for_completion
#[derive(Debug, Clone)]
pub struct CollectingObserver {
    pages: Arc<Mutex<Vec<Vec<Transaction>>>>,
    errors: Arc<Mutex<Vec<String>>>,
    fail_on_page: Arc<AtomicUsize>,
    progress: Arc<watch::Sender<Progress>>,
}

impl Default for CollectingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectingObserver {
    /// Creates an observer that accepts every delivery.
    pub fn new() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            pages: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            fail_on_page: Arc::new(AtomicUsize::new(0)),
            progress: Arc::new(progress),
        }
    }

    /// Scripts the `n`-th delivery (1-based) to be rejected with
    /// [`RejectedDelivery`].
    pub fn fail_on_page(&self, n: usize) {
        self.fail_on_page.store(n, Ordering::SeqCst);
    }

    /// Every accepted page, in delivery order.
    pub fn pages(&self) -> Vec<Vec<Transaction>> {
        self.pages.lock().expect("observer pages lock poisoned").clone()
    }

    /// Every accepted transaction, in delivery order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.pages().into_iter().flatten().collect()
    }

    /// Messages of the errors pushed via `on_error`.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("observer errors lock poisoned").clone()
    }

    /// Number of accepted pages so far.
    pub fn page_count(&self) -> usize {
        self.progress.borrow().pages
    }

    /// Number of accepted transactions so far.
    pub fn transaction_count(&self) -> usize {
        self.progress.borrow().transactions
    }

    /// Number of `on_completed` signals received.
    pub fn completion_count(&self) -> usize {
        self.progress.borrow().completions
    }

    /// Number of `on_error` signals received.
    pub fn error_count(&self) -> usize {
        self.progress.borrow().errors
    }

    /// Resolves once at least `n` pages were accepted.
    pub async fn wait_for_pages(&self, n: usize) {
        let mut progress = self.progress.subscribe();
        progress
            .wait_for(|p| p.pages >= n)
            .await
            .expect("progress sender lives in the observer");
    }

    /// Resolves once at least `n` transactions were accepted.
    pub async fn wait_for_transactions(&self, n: usize) {
        let mut progress = self.progress.subscribe();
        progress
            .wait_for(|p| p.transactions >= n)
            .await
            .expect("progress sender lives in the observer");
    }

    /// Resolves once `on_error` was received.
    pub async fn wait_for_error(&self) {
        let mut progress = self.progress.subscribe();
        progress
            .wait_for(|p| p.errors > 0)
            .await
            .expect("progress sender lives in the observer");
    }

    /// Resolves once `on_completed` was received.
    pub async fn wait_for_completion(&self) {
        let mut progress = self.progress.subscribe();
        progress
            .wait_for(|p| p.completions > 0)
            .await
            .expect("progress sender lives in the observer");
    }
}

#[async_trait]
impl PageObserver for CollectingObserver {
    async fn on_next(&self, transactions: Vec<Transaction>) -> Result<(), ObserverError> {
        let delivery = self.progress.borrow().pages + 1;
        if self.fail_on_page.load(Ordering::SeqCst) == delivery {
            return Err(Box::new(RejectedDelivery));
        }

        let delivered = transactions.len();
        self.pages
            .lock()
            .expect("observer pages lock poisoned")
            .push(transactions);
        self.progress.send_modify(|p| {
            p.pages += 1;
            p.transactions += delivered;
        });
        Ok(())
    }

    async fn on_error(&self, error: ObserverError) {
        self.errors
            .lock()
            .expect("observer errors lock poisoned")
            .push(error.to_string());
        self.progress.send_modify(|p| p.errors += 1);
    }

    async fn on_completed(&self) {
        self.progress.send_modify(|p| p.completions += 1);
    }
}
