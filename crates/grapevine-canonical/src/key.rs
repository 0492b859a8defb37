//! The canonical key type and its export representation.

use grapevine_model::Agent;
use serde::{Deserialize, Serialize};

/// A relabeling-invariant representative of a distribution: an ordered
/// sequence of ordered secret-id sequences (each inner sequence sorted
/// ascending).
///
/// Keys are opaque values: equality and ordering are all the engines
/// need. Keys produced by the exact and heuristic forms are not
/// comparable with each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalKey(Vec<Vec<Agent>>);

impl CanonicalKey {
    pub(crate) fn from_groups(groups: Vec<Vec<Agent>>) -> Self {
        debug_assert!(groups.iter().all(|g| g.windows(2).all(|w| w[0] < w[1])));
        CanonicalKey(groups)
    }

    /// The inner secret groups, in the key's own order.
    pub fn groups(&self) -> &[Vec<Agent>] {
        &self.0
    }

    /// The external representation: groups reordered by descending
    /// size, then ascending lexicographic content. Used for key dumps;
    /// the in-memory key keeps its form-specific order.
    pub fn display_groups(&self) -> Vec<Vec<Agent>> {
        let mut groups = self.0.clone();
        sort_for_display(&mut groups);
        groups
    }
}

/// Order groups by (descending size, ascending content).
pub(crate) fn sort_for_display(groups: &mut [Vec<Agent>]) {
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
}
