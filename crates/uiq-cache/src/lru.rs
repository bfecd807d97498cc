//! Bounded LRU map
//!
//! Recency is tracked with a monotonically increasing access counter; a
//! `BTreeMap` keyed by that counter finds the least recently used entry
//! without scanning.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Fixed-capacity map evicting the least recently used entry
#[derive(Debug)]
pub struct LruMap<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// access tick -> key
    order: BTreeMap<u64, K>,
    tick: u64,
    capacity: usize,
    evictions: u64,
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    last_access: u64,
}

impl<K: Hash + Eq + Clone, V> LruMap<K, V> {
    /// Create a map holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity.min(4096)),
            order: BTreeMap::new(),
            tick: 0,
            capacity,
            evictions: 0,
        }
    }

    /// Get a value and mark it as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.tick += 1;
        let tick = self.tick;
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.last_access);
        slot.last_access = tick;
        self.order.insert(tick, key.clone());
        Some(&slot.value)
    }

    /// Get a value without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|s| &s.value)
    }

    /// Insert or replace, evicting the LRU entry when full
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.tick += 1;
        let tick = self.tick;
        if let Some(slot) = self.entries.get_mut(&key) {
            self.order.remove(&slot.last_access);
            slot.last_access = tick;
            self.order.insert(tick, key);
            return Some(std::mem::replace(&mut slot.value, value));
        }

        while self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        self.order.insert(tick, key.clone());
        self.entries.insert(key, Slot { value, last_access: tick });
        None
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.last_access);
        Some(slot.value)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries evicted for capacity since creation
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    fn evict_lru(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
            self.evictions += 1;
        } else {
            // order and entries out of sync; rebuild from scratch
            self.entries.clear();
        }
    }
}
