#![doc = include_str!("../README.md")]

pub mod fixtures;
pub mod observer;
pub mod store;

pub use observer::CollectingObserver;
pub use store::{MockCommitStore, StoreCounters};

/// Polls `condition` until it holds, panicking after five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within five seconds"
        );
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}
