//! Tail-poll throttling.
//!
//! Once a fetch has seen the end of the log, asking the store the same
//! question again within the poll interval is wasted work. The tracker keeps
//! a single observation of the most recent tail sighting; a caller about to
//! fetch from that exact checkpoint waits out the remainder of the interval
//! first. Cold cursors are never delayed.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tailcast_core::Checkpoint;

/// One sighting of the log tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailObservation {
    /// Checkpoint the short fetch ended at.
    pub checkpoint: Checkpoint,
    /// When the fetch that produced the sighting was issued.
    pub observed_at: DateTime<Utc>,
}

/// Single-slot record of the most recent tail sighting.
///
/// Writers overwrite the whole record unconditionally; racy overwrites are
/// acceptable. The observation is advisory: it throttles, it does not gate
/// correctness.
#[derive(Debug, Default)]
pub struct TailTracker {
    slot: Mutex<Option<TailObservation>>,
}

impl TailTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tail sighting, replacing any previous one.
    pub fn record(&self, checkpoint: Checkpoint, observed_at: DateTime<Utc>) {
        *self.slot.lock().expect("tail slot lock poisoned") = Some(TailObservation {
            checkpoint,
            observed_at,
        });
    }

    /// Returns the current observation, if any.
    pub fn snapshot(&self) -> Option<TailObservation> {
        self.slot.lock().expect("tail slot lock poisoned").clone()
    }

    /// Returns `true` when `cursor` is the recorded tail checkpoint and the
    /// poll interval since the sighting has not yet elapsed.
    pub fn is_throttled(&self, cursor: &Checkpoint, poll_interval: Duration) -> bool {
        let Some(observation) = self.snapshot() else {
            return false;
        };
        if observation.checkpoint != *cursor {
            return false;
        }
        match (Utc::now() - observation.observed_at).to_std() {
            Ok(elapsed) => elapsed < poll_interval,
            Err(_) => false,
        }
    }

    /// Sleeps out the remainder of `poll_interval` when `cursor` is the
    /// recorded tail checkpoint; returns immediately otherwise.
    pub async fn wait_if_at(&self, cursor: &Checkpoint, poll_interval: Duration) {
        let Some(observation) = self.snapshot() else {
            return;
        };
        if observation.checkpoint != *cursor {
            return;
        }
        let Ok(elapsed) = (Utc::now() - observation.observed_at).to_std() else {
            // observation from the future (clock adjustment); skip the delay
            return;
        };
        if let Some(remaining) = poll_interval.checked_sub(elapsed)
            && !remaining.is_zero()
        {
            tokio::time::sleep(remaining).await;
        }
    }
}
