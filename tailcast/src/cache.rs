//! LRU checkpoint cache.
//!
//! Maps a predecessor checkpoint to the transaction that follows it in the
//! log. Keys are predecessor checkpoints, not transaction ids, so a page can
//! be assembled by walking `cursor → tx → tx.checkpoint → …` without knowing
//! anything about the store's token format. The origin sentinel is a valid
//! key like any other.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tailcast_core::{Checkpoint, Transaction};

/// Thread-safe, bounded successor cache with least-recently-used eviction.
///
/// A capacity of zero degenerates to pass-through: every [`try_get`] misses
/// and [`insert`] is a no-op. Two inserts racing on the same key are
/// permitted; the later writer wins.
///
/// [`try_get`]: CheckpointCache::try_get
/// [`insert`]: CheckpointCache::insert
pub struct CheckpointCache {
    entries: Option<Mutex<LruCache<Checkpoint, Transaction>>>,
}

impl std::fmt::Debug for CheckpointCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointCache")
            .field("len", &self.len())
            .finish()
    }
}

impl CheckpointCache {
    /// Creates a cache retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let entries = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Self { entries }
    }

    /// Looks up the successor of `key`, marking the entry most recently used.
    pub fn try_get(&self, key: &Checkpoint) -> Option<Transaction> {
        let entries = self.entries.as_ref()?;
        entries
            .lock()
            .expect("checkpoint cache lock poisoned")
            .get(key)
            .cloned()
    }

    /// Inserts or refreshes the successor of `key`.
    ///
    /// Refreshing an existing key updates both its value and its recency; at
    /// capacity the least recently used entry is evicted.
    pub fn insert(&self, key: Checkpoint, value: Transaction) {
        // a transaction is never its own successor
        if value.checkpoint == key {
            return;
        }
        if let Some(entries) = self.entries.as_ref() {
            entries
                .lock()
                .expect("checkpoint cache lock poisoned")
                .put(key, value);
        }
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        match self.entries.as_ref() {
            Some(entries) => entries.lock().expect("checkpoint cache lock poisoned").len(),
            None => 0,
        }
    }

    /// Returns `true` when no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tx(checkpoint: &str) -> Transaction {
        Transaction {
            id: format!("commit-{checkpoint}").into(),
            stream_id: "stream".into(),
            checkpoint: Checkpoint::new(checkpoint),
            timestamp_utc: Utc::now(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = CheckpointCache::new(4);
        cache.insert(Checkpoint::origin(), tx("1"));

        let hit = cache.try_get(&Checkpoint::origin()).unwrap();
        assert_eq!(hit.checkpoint, Checkpoint::new("1"));
        assert!(cache.try_get(&Checkpoint::new("1")).is_none());
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = CheckpointCache::new(2);
        cache.insert(Checkpoint::new("a"), tx("1"));
        cache.insert(Checkpoint::new("b"), tx("2"));

        // touching "a" makes "b" the eviction candidate
        assert!(cache.try_get(&Checkpoint::new("a")).is_some());
        cache.insert(Checkpoint::new("c"), tx("3"));

        assert!(cache.try_get(&Checkpoint::new("a")).is_some());
        assert!(cache.try_get(&Checkpoint::new("b")).is_none());
        assert!(cache.try_get(&Checkpoint::new("c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_refresh_updates_value_and_recency() {
        let cache = CheckpointCache::new(2);
        cache.insert(Checkpoint::new("a"), tx("1"));
        cache.insert(Checkpoint::new("b"), tx("2"));
        cache.insert(Checkpoint::new("a"), tx("9"));
        cache.insert(Checkpoint::new("c"), tx("3"));

        let hit = cache.try_get(&Checkpoint::new("a")).unwrap();
        assert_eq!(hit.checkpoint, Checkpoint::new("9"));
        assert!(cache.try_get(&Checkpoint::new("b")).is_none());
    }

    #[test]
    fn test_zero_capacity_is_pass_through() {
        let cache = CheckpointCache::new(0);
        cache.insert(Checkpoint::origin(), tx("1"));

        assert!(cache.try_get(&Checkpoint::origin()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let cache = CheckpointCache::new(4);
        cache.insert(Checkpoint::new("1"), tx("1"));

        assert!(cache.try_get(&Checkpoint::new("1")).is_none());
    }
}
