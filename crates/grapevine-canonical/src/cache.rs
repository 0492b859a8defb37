//! Bounded memoization of canonical keys.

use std::collections::HashMap;

use grapevine_model::Distribution;

use crate::key::CanonicalKey;

/// A capacity-bounded distribution → key memo map.
///
/// Eviction policy is full-flush: once the map reaches capacity it is
/// cleared entirely and refills from subsequent lookups. Crude, but it
/// bounds memory with zero bookkeeping per hit, and BFS workloads are
/// bursty enough that a refilled cache is warm again within one depth.
/// A capacity of zero disables caching.
#[derive(Debug)]
pub struct KeyCache {
    map: HashMap<Distribution, CanonicalKey>,
    capacity: usize,
}

impl KeyCache {
    pub fn new(capacity: usize) -> Self {
        KeyCache {
            map: HashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, dist: &Distribution) -> Option<&CanonicalKey> {
        self.map.get(dist)
    }

    pub fn insert(&mut self, dist: Distribution, key: CanonicalKey) {
        if self.capacity == 0 {
            return;
        }
        if self.map.len() >= self.capacity {
            self.map.clear();
        }
        self.map.insert(dist, key);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
