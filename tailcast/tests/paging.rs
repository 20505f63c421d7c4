//! Cold reads, cache-served pages, and preloading.

use std::time::Duration;

use tailcast::{AdapterConfig, PageSize, PollingAdapter};
use tailcast_core::Checkpoint;
use tailcast_test::fixtures::{checkpoint, commits};
use tailcast_test::{MockCommitStore, eventually};

/// Long enough that tail polling never interferes with a test.
const QUIET: Duration = Duration::from_secs(300);

fn config(max_page_size: u16) -> AdapterConfig {
    AdapterConfig::builder()
        .cache_size(1000)
        .poll_interval(QUIET)
        .max_page_size(PageSize::new_saturating(max_page_size))
        .build()
}

fn sequence_of(page: &tailcast_core::Page) -> Vec<Checkpoint> {
    page.transactions()
        .iter()
        .map(|tx| tx.checkpoint.clone())
        .collect()
}

#[tokio::test]
async fn cold_read_returns_everything_past_the_cursor() {
    let store = MockCommitStore::with_log(commits(1, 3));
    let adapter = PollingAdapter::new(store.clone(), config(10));

    let page = adapter.next_page(&Checkpoint::origin()).await.unwrap();

    assert_eq!(page.previous_checkpoint(), &Checkpoint::origin());
    assert_eq!(
        sequence_of(&page),
        vec![checkpoint(1), checkpoint(2), checkpoint(3)]
    );
    assert_eq!(page.last_checkpoint(), Some(&checkpoint(3)));
    assert_eq!(store.fetch_count(), 1);
    assert_eq!(store.calls()[0].0, Checkpoint::origin());
}

#[tokio::test]
async fn warm_cursors_are_served_from_cache() {
    let store = MockCommitStore::with_log(commits(1, 3));
    let adapter = PollingAdapter::new(store.clone(), config(10));

    adapter.next_page(&Checkpoint::origin()).await.unwrap();

    let replay = adapter.next_page(&Checkpoint::origin()).await.unwrap();
    assert_eq!(replay.len(), 3);

    let from_one = adapter.next_page(&checkpoint(1)).await.unwrap();
    assert_eq!(from_one.previous_checkpoint(), &checkpoint(1));
    assert_eq!(sequence_of(&from_one), vec![checkpoint(2), checkpoint(3)]);

    let from_two = adapter.next_page(&checkpoint(2)).await.unwrap();
    assert_eq!(sequence_of(&from_two), vec![checkpoint(3)]);

    // one cold fetch fed every follow-up
    assert_eq!(store.fetch_count(), 1);
}

#[tokio::test]
async fn page_is_bounded_by_max_page_size() {
    let store = MockCommitStore::with_log(commits(1, 8));
    let adapter = PollingAdapter::new(store.clone(), config(3));

    let page = adapter.next_page(&Checkpoint::origin()).await.unwrap();

    assert_eq!(
        sequence_of(&page),
        vec![checkpoint(1), checkpoint(2), checkpoint(3)]
    );
}

#[tokio::test]
async fn full_page_preloads_the_next_one() {
    let store = MockCommitStore::with_log(commits(1, 5));
    let adapter = PollingAdapter::new(store.clone(), config(3));

    let page = adapter.next_page(&Checkpoint::origin()).await.unwrap();
    assert_eq!(page.len(), 3);

    // no further caller: the preload fetches the rest on its own
    eventually(|| store.fetch_count() == 2).await;
    assert_eq!(store.calls()[1].0, checkpoint(3));

    let followup = adapter.next_page(&checkpoint(3)).await.unwrap();
    assert_eq!(sequence_of(&followup), vec![checkpoint(4), checkpoint(5)]);
    assert_eq!(store.fetch_count(), 2);
}

#[tokio::test]
async fn zero_cache_capacity_still_pages_correctly() {
    let store = MockCommitStore::with_log(commits(1, 4));
    let adapter = PollingAdapter::new(
        store.clone(),
        AdapterConfig::builder()
            .cache_size(0)
            .poll_interval(QUIET)
            .max_page_size(PageSize::new_saturating(2))
            .build(),
    );

    let first = adapter.next_page(&Checkpoint::origin()).await.unwrap();
    assert_eq!(sequence_of(&first), vec![checkpoint(1), checkpoint(2)]);

    let second = adapter.next_page(&checkpoint(2)).await.unwrap();
    assert_eq!(sequence_of(&second), vec![checkpoint(3), checkpoint(4)]);
}

#[tokio::test]
async fn store_failures_are_retried_silently() {
    let store = MockCommitStore::with_log(commits(1, 2));
    store.fail_next_fetches(1);
    let adapter = PollingAdapter::new(
        store.clone(),
        AdapterConfig::builder()
            .cache_size(1000)
            .poll_interval(Duration::from_millis(50))
            .max_page_size(PageSize::new_saturating(10))
            .build(),
    );

    // the first fetch fails; the loop retries on the poll cadence and the
    // caller never sees the error
    let page = adapter.next_page(&Checkpoint::origin()).await.unwrap();
    assert_eq!(sequence_of(&page), vec![checkpoint(1), checkpoint(2)]);
    assert!(store.fetch_count() >= 2);
}
