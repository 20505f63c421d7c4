//! Commit store abstraction.
//!
//! This module provides the [`CommitStore`] trait for the ordered,
//! checkpointed commit log the adapter polls.
//!
//! ## Overview
//!
//! The `CommitStore` trait abstracts over any backing store that can return
//! the commits strictly after a given checkpoint, in checkpoint order. The
//! adapter applies its own page-size bound on top, so implementations are
//! free to return as many commits as is convenient.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use thiserror::Error;

use crate::{Checkpoint, EventEnvelope, Transaction};

/// Result type for commit store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by a commit store during a fetch.
///
/// The adapter swallows these and retries on its poll cadence, so the
/// categories exist for logging and for store implementations, not for
/// callers of the adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network interaction error while reaching a remote store.
    #[error(transparent)]
    Connection(Box<dyn std::error::Error + Send + Sync>),

    /// Internal store error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Raw commit record as returned by a commit store.
///
/// One commit is one atomic group of events written to one stream at one
/// point in the log. The adapter normalizes commits into [`Transaction`]s
/// before delivering them.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Store-assigned commit identifier.
    pub commit_id: SmolStr,
    /// Identifier of the stream the commit was written to.
    pub stream_id: SmolStr,
    /// Position of this commit in the store's total order.
    pub checkpoint_token: Checkpoint,
    /// Wall clock at commit time.
    pub commit_stamp: DateTime<Utc>,
    /// Events of the commit, in commit order.
    pub events: Vec<EventEnvelope>,
}

impl From<Commit> for Transaction {
    fn from(commit: Commit) -> Self {
        Transaction {
            id: commit.commit_id,
            stream_id: commit.stream_id,
            checkpoint: commit.checkpoint_token,
            timestamp_utc: commit.commit_stamp,
            events: commit.events,
        }
    }
}

/// An ordered, checkpointed commit log the adapter polls.
///
/// # Contract
///
/// `get_from(checkpoint)` returns commits **strictly after** `checkpoint` in
/// checkpoint order. [`Checkpoint::origin`] addresses the beginning of the
/// log. The sequence must be finite; the adapter truncates it to its page
/// size.
#[async_trait]
pub trait CommitStore: Send + Sync + 'static {
    /// Fetches the commits strictly after `checkpoint`.
    async fn get_from(&self, checkpoint: &Checkpoint) -> StoreResult<Vec<Commit>>;

    /// Releases underlying resources.
    ///
    /// Called exactly once, by the adapter's shutdown, after the last
    /// in-flight fetch has resolved.
    async fn dispose(&self) {}
}

#[async_trait]
impl<S> CommitStore for std::sync::Arc<S>
where
    S: CommitStore,
{
    async fn get_from(&self, checkpoint: &Checkpoint) -> StoreResult<Vec<Commit>> {
        self.as_ref().get_from(checkpoint).await
    }

    async fn dispose(&self) {
        self.as_ref().dispose().await
    }
}
