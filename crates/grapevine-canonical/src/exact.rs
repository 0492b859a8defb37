//! Exact canonical form: minimum over all agent relabelings.

use grapevine_model::{Agent, AgentSet, Distribution};

use crate::key::CanonicalKey;

/// The reference canonical key: enumerate all `n!` relabelings σ, apply
/// σ to both agent positions and secret ids, and keep the
/// lexicographically smallest row tuple.
///
/// Two distributions are isomorphic under agent relabeling iff their
/// exact keys are equal. Cost O(n!·n log n); intended for n ≤ ~9.
pub fn exact_key(dist: &Distribution) -> CanonicalKey {
    let n = dist.n();
    let secrets = dist.secrets();

    let mut perm: Vec<Agent> = (0..n as Agent).collect();
    let mut best = relabeled_rows(secrets, &perm);

    // Heap's algorithm over the remaining n! − 1 permutations.
    let mut counters = vec![0usize; n];
    let mut i = 0;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                perm.swap(0, i);
            } else {
                perm.swap(counters[i], i);
            }
            let candidate = relabeled_rows(secrets, &perm);
            if candidate < best {
                best = candidate;
            }
            counters[i] += 1;
            i = 0;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }

    CanonicalKey::from_groups(best)
}

// Row σ(i) receives agent i's secrets with every id s rewritten to σ(s).
fn relabeled_rows(secrets: &[AgentSet], perm: &[Agent]) -> Vec<Vec<Agent>> {
    let mut rows = vec![Vec::new(); secrets.len()];
    for (i, set) in secrets.iter().enumerate() {
        let relabeled: AgentSet = set.iter().map(|s| perm[s as usize]).collect();
        rows[perm[i] as usize] = relabeled.to_vec();
    }
    rows
}
