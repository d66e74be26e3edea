//! Minimal bounded, in-memory LRU cache backing [`crate::store::RegistryStore::get`].
//!
//! Not a general-purpose cache crate; just enough eviction policy to keep
//! memory bounded when the registry holds thousands of records, per the
//! design's "in-memory LRU-style cache keyed by media_id."

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct LruCache<V> {
    capacity: usize,
    entries: HashMap<i64, Arc<V>>,
    order: VecDeque<i64>,
}

impl<V> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, key: i64) -> Option<Arc<V>> {
        if let Some(value) = self.entries.get(&key).cloned() {
            self.touch(key);
            Some(value)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: i64, value: Arc<V>) {
        if self.entries.insert(key, value).is_none() {
            self.order.push_back(key);
        }
        self.touch(key);
        self.evict_if_needed();
    }

    pub fn remove(&mut self, key: i64) {
        self.entries.remove(&key);
        self.order.retain(|k| *k != key);
    }

    fn touch(&mut self, key: i64) {
        self.order.retain(|k| *k != key);
        self.order.push_back(key);
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache: LruCache<i32> = LruCache::new(2);
        cache.insert(1, Arc::new(1));
        cache.insert(2, Arc::new(2));
        cache.get(1); // 1 is now more recently used than 2
        cache.insert(3, Arc::new(3)); // evicts 2
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
    }
}
