//! Tail-poll throttling against the store.

use std::time::{Duration, Instant};

use tailcast::{AdapterConfig, PageSize, PollingAdapter};
use tailcast_core::Checkpoint;
use tailcast_test::MockCommitStore;
use tailcast_test::fixtures::{checkpoint, commit, commits};

const INTERVAL: Duration = Duration::from_millis(200);

// The mock records call instants a hair after the throttle stamps its
// observation, so spacing assertions use a small allowance.
const SPACING: Duration = Duration::from_millis(180);

fn config() -> AdapterConfig {
    AdapterConfig::builder()
        .cache_size(1000)
        .poll_interval(INTERVAL)
        .max_page_size(PageSize::new_saturating(10))
        .build()
}

#[tokio::test]
async fn repolling_the_tail_waits_out_the_interval() {
    let store = MockCommitStore::with_log(commits(1, 2));
    let adapter = PollingAdapter::new(store.clone(), config());

    // the short cold read records the tail at checkpoint 2
    adapter.next_page(&Checkpoint::origin()).await.unwrap();

    let poller = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.next_page(&checkpoint(2)).await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.append(commit(3));

    let page = poller.await.unwrap();
    assert_eq!(page.transactions()[0].checkpoint, checkpoint(3));

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, checkpoint(2));
    assert!(calls[1].1.duration_since(calls[0].1) >= SPACING);
}

#[tokio::test]
async fn consecutive_empty_polls_are_spaced() {
    let store = MockCommitStore::with_log(commits(1, 2));
    let adapter = PollingAdapter::new(store.clone(), config());

    adapter.next_page(&Checkpoint::origin()).await.unwrap();

    // nothing ever arrives past the tail; the call must still be polling
    // when the timeout cuts it off
    let starved = tokio::time::timeout(
        Duration::from_millis(650),
        adapter.next_page(&checkpoint(2)),
    )
    .await;
    assert!(starved.is_err());

    let polls: Vec<Instant> = store
        .calls()
        .into_iter()
        .filter(|(cursor, _)| *cursor == checkpoint(2))
        .map(|(_, at)| at)
        .collect();
    assert!(!polls.is_empty());
    for pair in polls.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= SPACING);
    }
}

#[tokio::test]
async fn cold_cursors_are_not_delayed() {
    let store = MockCommitStore::with_log(commits(1, 2));
    let adapter = PollingAdapter::new(store.clone(), config());

    adapter.next_page(&Checkpoint::origin()).await.unwrap();

    // checkpoint 7 is unknown to the store, but it is not the recorded
    // tail, so the first poll for it goes out immediately
    let started = Instant::now();
    let _ = tokio::time::timeout(
        Duration::from_millis(100),
        adapter.next_page(&checkpoint(7)),
    )
    .await;

    let first_poll = store
        .calls()
        .into_iter()
        .find(|(cursor, _)| *cursor == checkpoint(7))
        .expect("the cold cursor was polled");
    assert!(first_poll.1.duration_since(started) < Duration::from_millis(50));
}
