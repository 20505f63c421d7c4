//! Adapter shutdown semantics.

use std::time::Duration;

use tailcast::{AdapterConfig, AdapterError, PageSize, PollingAdapter};
use tailcast_core::Checkpoint;
use tailcast_test::fixtures::commits;
use tailcast_test::{CollectingObserver, MockCommitStore, eventually};

const QUIET: Duration = Duration::from_secs(300);

fn config() -> AdapterConfig {
    AdapterConfig::builder()
        .cache_size(1000)
        .poll_interval(QUIET)
        .max_page_size(PageSize::new_saturating(10))
        .build()
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let store = MockCommitStore::with_log(commits(1, 2));
    let adapter = PollingAdapter::new(store.clone(), config());

    adapter.dispose().await;
    adapter.dispose().await;

    assert!(adapter.is_disposed());
    assert_eq!(store.counters().dispose_count(), 1);
}

#[tokio::test]
async fn operations_fail_after_dispose() {
    let store = MockCommitStore::with_log(commits(1, 2));
    let adapter = PollingAdapter::new(store.clone(), config());

    adapter.dispose().await;

    assert_eq!(
        adapter.next_page(&Checkpoint::origin()).await,
        Err(AdapterError::Disposed)
    );
    assert!(
        adapter
            .subscribe(Checkpoint::origin(), CollectingObserver::new())
            .is_err()
    );
}

#[tokio::test]
async fn dispose_waits_for_the_inflight_fetch() {
    let store = MockCommitStore::with_log(commits(1, 3));
    store.close_gate();
    let adapter = PollingAdapter::new(store.clone(), config());

    let reader = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.next_page(&Checkpoint::origin()).await })
    };
    eventually(|| store.fetch_count() == 1).await;

    let disposer = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.dispose().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // the store must not be released while its fetch is still running
    assert_eq!(store.counters().dispose_count(), 0);

    store.open_gate();
    disposer.await.unwrap();
    assert_eq!(store.counters().dispose_count(), 1);

    // the reader entered before dispose; it resolves rather than hangs
    let page = reader.await.unwrap().unwrap();
    assert!(page.len() == 3 || page.is_empty());

    assert!(
        adapter
            .subscribe(Checkpoint::origin(), CollectingObserver::new())
            .is_err()
    );
}

#[tokio::test]
async fn dispose_completes_live_subscriptions() {
    let store = MockCommitStore::with_log(commits(1, 2));
    let adapter = PollingAdapter::new(store.clone(), config());
    let observer = CollectingObserver::new();

    let subscription = adapter
        .subscribe(Checkpoint::origin(), observer.clone())
        .unwrap();
    observer.wait_for_transactions(2).await;

    adapter.dispose().await;

    assert_eq!(observer.completion_count(), 1);
    assert_eq!(observer.error_count(), 0);
    assert!(subscription.is_disposed());
    assert_eq!(store.counters().dispose_count(), 1);
}

#[tokio::test]
async fn dispose_races_with_busy_subscribers() {
    let store = MockCommitStore::with_log(commits(1, 40));
    let adapter = PollingAdapter::new(
        store.clone(),
        AdapterConfig::builder()
            .cache_size(1000)
            .poll_interval(QUIET)
            .max_page_size(PageSize::new_saturating(2))
            .build(),
    );

    let observers: Vec<CollectingObserver> =
        (0..3).map(|_| CollectingObserver::new()).collect();
    for observer in &observers {
        adapter
            .subscribe(Checkpoint::origin(), observer.clone())
            .unwrap();
    }

    observers[0].wait_for_transactions(4).await;
    adapter.dispose().await;

    for observer in &observers {
        // exactly one terminal signal, and an ordered prefix either way
        assert_eq!(observer.completion_count(), 1);
        assert_eq!(observer.error_count(), 0);
        let sequence: Vec<u64> = observer
            .transactions()
            .iter()
            .map(|tx| tx.checkpoint.as_str().parse().unwrap())
            .collect();
        let expected: Vec<u64> = (1..=sequence.len() as u64).collect();
        assert_eq!(sequence, expected);
    }
    assert_eq!(store.counters().dispose_count(), 1);
}
