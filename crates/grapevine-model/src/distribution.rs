//! Per-agent secret distributions.

use crate::sets::AgentSet;
use crate::{Agent, Call};

/// Ordered assignment of known secrets: entry `i` is the set of
/// secret-origin ids known by agent `i`.
///
/// Invariants: `len == n`, agent `i` always knows secret `i`, and
/// knowledge only grows under [`Distribution::apply_call`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Distribution {
    secrets: Vec<AgentSet>,
}

impl Distribution {
    /// The starting distribution: every agent knows only its own secret.
    pub fn initial(n: usize) -> Self {
        Distribution {
            secrets: (0..n as Agent).map(AgentSet::singleton).collect(),
        }
    }

    /// Rebuild a distribution from nested secret groups, e.g. a
    /// decoded canonical key. Group `i` becomes agent `i`'s secret set.
    pub fn from_groups(groups: &[Vec<Agent>]) -> Self {
        Distribution {
            secrets: groups
                .iter()
                .map(|g| g.iter().copied().collect())
                .collect(),
        }
    }

    /// Number of agents.
    pub fn n(&self) -> usize {
        self.secrets.len()
    }

    /// Secret set of a single agent.
    pub fn secrets_of(&self, agent: Agent) -> AgentSet {
        self.secrets[agent as usize]
    }

    /// All per-agent secret sets, in agent order.
    pub fn secrets(&self) -> &[AgentSet] {
        &self.secrets
    }

    /// Apply one call: both parties end up knowing the union of what
    /// either knew before. Direction is irrelevant here.
    pub fn apply_call(&self, call: Call) -> Distribution {
        let united = self
            .secrets_of(call.caller)
            .union(self.secrets_of(call.callee));
        let mut secrets = self.secrets.clone();
        secrets[call.caller as usize] = united;
        secrets[call.callee as usize] = united;
        Distribution { secrets }
    }

    /// True iff every agent is an expert: knows the union of all secrets.
    pub fn is_final(&self) -> bool {
        let all = self
            .secrets
            .iter()
            .fold(AgentSet::EMPTY, |acc, s| acc.union(*s));
        self.secrets.iter().all(|s| *s == all)
    }
}
