//! [`BoundedLruMap`] is the shared-state primitive of the monitor: a
//! fixed-capacity key/value table where a full table silently evicts the
//! least-recently-accessed entry instead of rejecting the write.
//!
//! Single-key operations are atomic. Sequences of operations over multiple
//! keys are not: callers must treat a missing entry as a normal outcome,
//! never as corruption.

use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hash},
    num::NonZeroUsize,
    sync::Mutex,
};

use lru::LruCache;

/// Default number of lock shards. More shards reduce contention between
/// unrelated keys at the cost of making eviction order per-shard.
pub const DEFAULT_SHARDS: usize = 8;

/// A bounded, concurrently-accessed LRU table.
///
/// The table is split into independently locked shards, each an LRU cache
/// of `capacity / shards` entries (rounded up). Eviction is therefore exact
/// per shard and approximate globally; callers that need a strict global
/// LRU order can construct the table with a single shard.
pub struct BoundedLruMap<K, V> {
    shards: Box<[Mutex<LruCache<K, V>>]>,
    hasher: RandomState,
}

impl<K: Hash + Eq, V> BoundedLruMap<K, V> {
    /// Create a table holding at most `capacity` entries (rounded up to a
    /// multiple of [`DEFAULT_SHARDS`]).
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self::with_capacity_and_shards(
            capacity,
            NonZeroUsize::new(DEFAULT_SHARDS).expect("DEFAULT_SHARDS is non-zero"),
        )
    }

    pub fn with_capacity_and_shards(capacity: NonZeroUsize, shards: NonZeroUsize) -> Self {
        let per_shard = capacity.get().div_ceil(shards.get()).max(1);
        let per_shard = NonZeroUsize::new(per_shard).expect("per-shard capacity is non-zero");
        let shards = (0..shards.get())
            .map(|_| Mutex::new(LruCache::new(per_shard)))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Look up `key`, marking the entry as most recently used.
    ///
    /// A miss means the entry was never inserted or has been evicted; both
    /// are expected.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shard(key).get(key).cloned()
    }

    /// Insert or overwrite the entry for `key`. When the shard is full the
    /// least-recently-used entry is evicted; insertion never fails.
    pub fn insert(&self, key: K, value: V) {
        self.shard(&key).put(key, value);
    }

    /// Remove and return the entry for `key`, if present.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).pop(key)
    }

    /// Whether `key` is present, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).contains(key)
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|e| e.into_inner()).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Effective capacity: the nominal capacity rounded up to a multiple of
    /// the shard count.
    pub fn capacity(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(|e| e.into_inner()).cap().get())
            .sum()
    }

    fn shard(&self, key: &K) -> std::sync::MutexGuard<'_, LruCache<K, V>> {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        // A poisoned shard only means another thread panicked while holding
        // the lock; the cache itself is still consistent.
        self.shards[index].lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn single_shard(capacity: usize) -> BoundedLruMap<u32, u32> {
        BoundedLruMap::with_capacity_and_shards(
            NonZeroUsize::new(capacity).unwrap(),
            NonZeroUsize::new(1).unwrap(),
        )
    }

    #[test]
    fn get_and_miss() {
        let table = single_shard(4);
        table.insert(1, 100);
        assert_eq!(table.get(&1), Some(100));
        assert_eq!(table.get(&2), None);
    }

    #[test]
    fn insert_overwrites() {
        let table = single_shard(4);
        table.insert(1, 100);
        table.insert(1, 200);
        assert_eq!(table.get(&1), Some(200));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn full_table_evicts_least_recently_used() {
        let table = single_shard(3);
        table.insert(1, 1);
        table.insert(2, 2);
        table.insert(3, 3);
        // Touch 1 so 2 becomes the eviction candidate.
        assert_eq!(table.get(&1), Some(1));
        table.insert(4, 4);
        assert_eq!(table.get(&2), None);
        assert_eq!(table.get(&1), Some(1));
        assert_eq!(table.get(&3), Some(3));
        assert_eq!(table.get(&4), Some(4));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn insert_beyond_capacity_never_fails() {
        let table = single_shard(8);
        for i in 0..1000 {
            table.insert(i, i);
        }
        assert_eq!(table.len(), 8);
        // The most recent insertions survive.
        for i in 992..1000 {
            assert_eq!(table.get(&i), Some(i));
        }
    }

    #[test]
    fn remove_entry() {
        let table = single_shard(4);
        table.insert(1, 100);
        assert_eq!(table.remove(&1), Some(100));
        assert_eq!(table.remove(&1), None);
        assert!(table.is_empty());
    }

    #[test]
    fn contains_does_not_promote() {
        let table = single_shard(2);
        table.insert(1, 1);
        table.insert(2, 2);
        assert!(table.contains(&1));
        table.insert(3, 3);
        // 1 was only peeked at, so it is still the eviction victim.
        assert_eq!(table.get(&1), None);
    }

    #[test]
    fn sharded_capacity_rounds_up() {
        let table: BoundedLruMap<u32, u32> = BoundedLruMap::with_capacity_and_shards(
            NonZeroUsize::new(4095).unwrap(),
            NonZeroUsize::new(8).unwrap(),
        );
        assert_eq!(table.capacity(), 4096);
    }

    #[test]
    fn concurrent_inserts_stay_bounded() {
        let table = Arc::new(BoundedLruMap::with_capacity(
            NonZeroUsize::new(64).unwrap(),
        ));
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    for i in 0..1000u32 {
                        table.insert(t * 1000 + i, i);
                        let _ = table.get(&(t * 1000));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(table.len() <= table.capacity());
    }
}
