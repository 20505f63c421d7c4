//! Observer contract for the push side of the adapter.

use async_trait::async_trait;
use std::sync::Arc;

use crate::Transaction;

/// Error surfaced by an observer callback.
///
/// Any error returned from [`PageObserver::on_next`] is terminal for the
/// subscription that delivered the page.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Sink for the pages a subscription delivers.
///
/// One subscription owns one observer and serializes all calls on it: a new
/// `on_next` is never issued before the previous one returned, and exactly
/// one of `on_error` / `on_completed` ends the stream.
#[async_trait]
pub trait PageObserver: Send + Sync + 'static {
    /// Delivers the transactions of one page, in store order.
    ///
    /// Returning an error fails the subscription: no further pages are
    /// delivered and [`on_error`](PageObserver::on_error) receives the error.
    async fn on_next(&self, transactions: Vec<Transaction>) -> Result<(), ObserverError>;

    /// Signals that the subscription failed and will deliver nothing more.
    async fn on_error(&self, error: ObserverError);

    /// Signals orderly termination of the subscription.
    async fn on_completed(&self);
}

#[async_trait]
impl<T> PageObserver for Arc<T>
where
    T: PageObserver,
{
    async fn on_next(&self, transactions: Vec<Transaction>) -> Result<(), ObserverError> {
        self.as_ref().on_next(transactions).await
    }

    async fn on_error(&self, error: ObserverError) {
        self.as_ref().on_error(error).await
    }

    async fn on_completed(&self) {
        self.as_ref().on_completed().await
    }
}
