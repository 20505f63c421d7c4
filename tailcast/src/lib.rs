#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// The polling adapter itself.
///
/// [`PollingAdapter`](adapter::PollingAdapter) combines the checkpoint
/// cache, the single-flight slot, and the tail tracker into the paged
/// loader core, and owns the subscription set and shutdown sequencing.
pub mod adapter;

/// LRU checkpoint cache.
///
/// Maps predecessor checkpoints to their successor transactions so
/// followers replay a fetched stretch of the log without touching the
/// store.
pub mod cache;

/// Single-flight load coalescing.
///
/// Guarantees at most one in-flight fetch against the commit store across
/// all concurrent callers; everyone else awaits the same result.
pub mod concurrency;

/// Adapter configuration types.
pub mod config;

/// Error types for adapter operations.
pub mod error;

/// Metrics collection for adapter observability.
///
/// When the `metrics` feature is enabled, this module provides counters and
/// gauges for cache hits, store polls, preloads, page deliveries, and live
/// subscriptions.
pub mod metrics;

/// Background task offloading.
///
/// Fetches and preloads run detached from their callers; the pool tracks
/// them so shutdown can wait everything out before releasing the store.
pub mod offload;

/// Push subscriptions over the paged pull core.
pub mod subscription;

/// Tail-poll throttling.
///
/// Rate-limits repeated "am I still at the tail?" polls without ever
/// slowing cold reads.
pub mod tail;

pub use adapter::PollingAdapter;
pub use config::{AdapterConfig, AdapterConfigBuilder, PageSize};
pub use error::AdapterError;
pub use subscription::Subscription;

pub use tailcast_core::{
    Checkpoint, Commit, CommitStore, EventEnvelope, ObserverError, Page, PageObserver, StoreError,
    StoreResult, Transaction,
};

/// The `tailcast` prelude.
///
/// Provides convenient access to the most commonly used types:
///
/// ```rust
/// use tailcast::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AdapterConfig, AdapterError, Checkpoint, CommitStore, Page, PageObserver, PollingAdapter,
    };
}
