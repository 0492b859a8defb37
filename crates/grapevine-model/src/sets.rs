//! Compact bitmask sets over agent indices and unordered agent pairs.

use crate::{Agent, MAX_AGENTS};

/// A set of agent indices, backed by a `u16` bitmask.
///
/// Used both for secret sets (a secret is named by its origin agent)
/// and for token-holder sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AgentSet(u16);

impl AgentSet {
    /// The empty set.
    pub const EMPTY: AgentSet = AgentSet(0);

    /// Set containing only `agent`.
    pub fn singleton(agent: Agent) -> Self {
        debug_assert!((agent as usize) < MAX_AGENTS);
        AgentSet(1 << agent)
    }

    /// Set containing all agents `0..n`.
    pub fn full(n: usize) -> Self {
        debug_assert!(n <= MAX_AGENTS);
        AgentSet(((1u32 << n) - 1) as u16)
    }

    pub fn contains(self, agent: Agent) -> bool {
        self.0 & (1 << agent) != 0
    }

    pub fn insert(&mut self, agent: Agent) {
        self.0 |= 1 << agent;
    }

    pub fn remove(&mut self, agent: Agent) {
        self.0 &= !(1 << agent);
    }

    pub fn union(self, other: AgentSet) -> AgentSet {
        AgentSet(self.0 | other.0)
    }

    /// True iff every member of `self` is a member of `other`.
    pub fn is_subset(self, other: AgentSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in ascending order.
    pub fn iter(self) -> impl Iterator<Item = Agent> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let a = bits.trailing_zeros() as Agent;
                bits &= bits - 1;
                Some(a)
            }
        })
    }

    /// Members collected in ascending order.
    pub fn to_vec(self) -> Vec<Agent> {
        self.iter().collect()
    }
}

impl FromIterator<Agent> for AgentSet {
    fn from_iter<I: IntoIterator<Item = Agent>>(iter: I) -> Self {
        let mut set = AgentSet::EMPTY;
        for a in iter {
            set.insert(a);
        }
        set
    }
}

/// A set of unordered agent pairs, backed by a `u128` bitmask.
///
/// Records which pairs have already spoken (the CO and LNS protocols
/// admit a call only for pairs not yet in this set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PairSet(u128);

impl PairSet {
    /// The empty set.
    pub const EMPTY: PairSet = PairSet(0);

    // Triangular index of the unordered pair {a, b} with a < b.
    fn bit(a: Agent, b: Agent) -> u128 {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        debug_assert!(lo < hi && (hi as usize) < MAX_AGENTS);
        let idx = (hi as u32 * (hi as u32 - 1)) / 2 + lo as u32;
        1u128 << idx
    }

    pub fn contains(self, a: Agent, b: Agent) -> bool {
        self.0 & Self::bit(a, b) != 0
    }

    pub fn insert(&mut self, a: Agent, b: Agent) {
        self.0 |= Self::bit(a, b);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_and_union() {
        let a = AgentSet::singleton(0);
        let b = AgentSet::singleton(3);
        let u = a.union(b);
        assert!(u.contains(0));
        assert!(u.contains(3));
        assert!(!u.contains(1));
        assert_eq!(u.len(), 2);
        assert_eq!(u.to_vec(), vec![0, 3]);
    }

    #[test]
    fn full_set_covers_all_agents() {
        let s = AgentSet::full(5);
        assert_eq!(s.len(), 5);
        assert_eq!(s.to_vec(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn subset_relation() {
        let small: AgentSet = [1u8, 2].into_iter().collect();
        let big: AgentSet = [0u8, 1, 2].into_iter().collect();
        assert!(small.is_subset(big));
        assert!(!big.is_subset(small));
        assert!(AgentSet::EMPTY.is_subset(small));
    }

    #[test]
    fn pair_set_is_unordered() {
        let mut pairs = PairSet::EMPTY;
        pairs.insert(2, 0);
        assert!(pairs.contains(0, 2));
        assert!(pairs.contains(2, 0));
        assert!(!pairs.contains(0, 1));
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn pair_indices_do_not_collide() {
        let mut pairs = PairSet::EMPTY;
        let n = MAX_AGENTS as Agent;
        let mut count = 0;
        for b in 1..n {
            for a in 0..b {
                pairs.insert(a, b);
                count += 1;
                assert_eq!(pairs.len(), count, "{{{a},{b}}} collided");
            }
        }
    }
}
