//! The per-run result record.

use std::collections::{BTreeMap, HashSet};

use grapevine_canonical::CanonicalKey;

/// Outcome of one BFS run, serial or parallel.
#[derive(Debug, Clone)]
pub struct BfsResult {
    /// Number of distinct canonical keys reached within the depth bound.
    pub reachable_count: usize,
    /// Keys first discovered at each depth.
    pub layers: BTreeMap<usize, HashSet<CanonicalKey>>,
    /// `layers` by cardinality only.
    pub layer_sizes: BTreeMap<usize, usize>,
    /// Explored edges. The serial engine counts one per locally-unique
    /// successor; the parallel engine counts keys surviving batch
    /// deduplication, which is lower for the same run.
    pub transitions: u64,
}

impl BfsResult {
    pub(crate) fn new(
        layers: BTreeMap<usize, HashSet<CanonicalKey>>,
        transitions: u64,
    ) -> Self {
        let layer_sizes = layers.iter().map(|(&d, keys)| (d, keys.len())).collect();
        let reachable_count = layers.values().map(HashSet::len).sum();
        BfsResult {
            reachable_count,
            layers,
            layer_sizes,
            transitions,
        }
    }

    /// Layer sizes as a dense vector from depth 0 through the deepest
    /// populated layer. Depths with no new states report 0.
    pub fn per_level(&self) -> Vec<usize> {
        let Some(&max) = self.layer_sizes.keys().next_back() else {
            return Vec::new();
        };
        (0..=max)
            .map(|d| self.layer_sizes.get(&d).copied().unwrap_or(0))
            .collect()
    }
}
