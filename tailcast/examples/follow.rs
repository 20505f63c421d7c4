//! Example of following a commit store with a push subscription.
//!
//! A mock in-memory store stands in for a real commit log; one projector
//! follows it from the origin while commits keep arriving.

use std::time::Duration;

use tailcast::{AdapterConfig, PageSize, PollingAdapter};
use tailcast_core::{Checkpoint, ObserverError, PageObserver, Transaction};
use tailcast_test::MockCommitStore;
use tailcast_test::fixtures::{commit, commits};

struct PrintingProjector;

#[async_trait::async_trait]
impl PageObserver for PrintingProjector {
    async fn on_next(&self, transactions: Vec<Transaction>) -> Result<(), ObserverError> {
        let checkpoints: Vec<&str> = transactions
            .iter()
            .map(|tx| tx.checkpoint.as_str())
            .collect();
        println!("page of {} transactions: {checkpoints:?}", transactions.len());
        Ok(())
    }

    async fn on_error(&self, error: ObserverError) {
        eprintln!("subscription failed: {error}");
    }

    async fn on_completed(&self) {
        println!("subscription completed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = MockCommitStore::with_log(commits(1, 5));
    let adapter = PollingAdapter::new(
        store.clone(),
        AdapterConfig::builder()
            .cache_size(1000)
            .poll_interval(Duration::from_millis(200))
            .max_page_size(PageSize::new_saturating(3))
            .build(),
    );

    let subscription = adapter.subscribe(Checkpoint::origin(), PrintingProjector)?;

    // more commits arrive while the subscription is live
    for n in 6..=9 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        store.append(commit(n));
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    subscription.complete().await;
    adapter.dispose().await;
    Ok(())
}
