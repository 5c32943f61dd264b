//! In-memory memoization with least-recently-used eviction.
//!
//! Entries never expire; once `capacity` distinct keys are held, inserting a
//! new key evicts the one touched longest ago. The cache is `Mutex`-guarded so
//! one instance can be shared across capture workers.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

struct LruState<K, V> {
    entries: HashMap<K, (V, u64)>,
    /// Access tick -> key, oldest first.
    order: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V: Clone> LruState<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        let (value, last) = self.entries.get_mut(key)?;
        self.order.remove(last);
        *last = tick;
        self.order.insert(tick, key.clone());
        Some(value.clone())
    }

    fn insert(&mut self, key: K, value: V, capacity: usize) {
        let tick = self.next_tick();
        if let Some((_, last)) = self.entries.remove(&key) {
            self.order.remove(&last);
        } else if self.entries.len() >= capacity
            && let Some((_, oldest)) = self.order.pop_first()
        {
            self.entries.remove(&oldest);
        }
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
    }
}

/// Fixed-capacity memo table.
pub struct MemoCache<K, V> {
    capacity: usize,
    state: Mutex<LruState<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> MemoCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key`, marking it as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn insert(&self, key: K, value: V) {
        let capacity = self.capacity;
        self.lock().insert(key, value, capacity);
    }

    /// Returns the cached value for `key`, or computes and stores it.
    ///
    /// Errors from `compute` are returned as-is and nothing is stored, so a
    /// failed computation is retried on the next call. The lock is not held
    /// while `compute` runs.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            trace!("memo cache hit");
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, LruState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = MemoCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Touch "a" so "b" becomes the eviction victim.
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let cache = MemoCache::new(2);
        cache.insert("a", 1);
        cache.insert("a", 10);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
    }

    #[test]
    fn test_get_or_try_insert_with_computes_once() {
        let cache = MemoCache::new(8);
        let calls = Cell::new(0);
        for _ in 0..3 {
            let value: Result<u32, ()> = cache.get_or_try_insert_with(&"key", || {
                calls.set(calls.get() + 1);
                Ok(42)
            });
            assert_eq!(value, Ok(42));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_errors_are_not_memoized() {
        let cache: MemoCache<&str, u32> = MemoCache::new(8);
        let first: Result<u32, &str> = cache.get_or_try_insert_with(&"key", || Err("boom"));
        assert_eq!(first, Err("boom"));
        assert!(cache.is_empty());

        let second: Result<u32, &str> = cache.get_or_try_insert_with(&"key", || Ok(7));
        assert_eq!(second, Ok(7));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = MemoCache::new(0);
        cache.insert(1, "one");
        cache.insert(2, "two");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some("two"));
    }
}
