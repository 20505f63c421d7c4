//! Helpers for building commits with predictable checkpoints.

use chrono::Utc;
use serde_json::json;
use tailcast_core::{Checkpoint, Commit, EventEnvelope};

/// A checkpoint with the fixture numbering scheme.
pub fn checkpoint(n: u64) -> Checkpoint {
    Checkpoint::new(n.to_string())
}

/// One commit at checkpoint `n` on the default stream.
pub fn commit(n: u64) -> Commit {
    commit_in_stream(n, "stream-1")
}

/// One commit at checkpoint `n` on `stream_id`, carrying a single event
/// whose body records the checkpoint.
pub fn commit_in_stream(n: u64, stream_id: &str) -> Commit {
    Commit {
        commit_id: format!("commit-{n}").into(),
        stream_id: stream_id.into(),
        checkpoint_token: checkpoint(n),
        commit_stamp: Utc::now(),
        events: vec![EventEnvelope::new(json!({ "sequence": n }))],
    }
}

/// Commits at checkpoints `first..=last` on the default stream.
pub fn commits(first: u64, last: u64) -> Vec<Commit> {
    (first..=last).map(commit).collect()
}
