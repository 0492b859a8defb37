//! Monte-Carlo estimation of expected call-sequence length.
//!
//! Independent of the BFS engines: each run drives the transition rules
//! along a single random legal call sequence until every agent is an
//! expert (or a step cap is hit), and the expectation is estimated over
//! many seeded runs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use grapevine_model::{
    permitted_calls, AdmissionPolicy, Distribution, Protocol, ProtocolState, MAX_AGENTS,
};

/// Result type for estimator operations.
pub type Result<T> = std::result::Result<T, EstimateError>;

/// Errors that can occur setting up an estimation run.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// ATK has no built-in admission rule to walk under
    #[error("protocol {0} has no built-in admission rule; use random_run_with")]
    MissingAdmissionPolicy(Protocol),

    /// Zero runs requested; the mean would be undefined
    #[error("at least one run is required")]
    NoRuns,

    /// Agent count beyond what the bitmask sets can hold
    #[error("n = {0} exceeds the supported maximum of {max} agents", max = MAX_AGENTS)]
    TooManyAgents(usize),
}

/// Mean and sample standard deviation of the walk lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub mean: f64,
    pub stdev: f64,
    pub runs: usize,
}

/// One random legal call sequence under `policy`, starting from the
/// initial distribution. Returns the number of calls made before every
/// agent became an expert, or before the walk ran out of admissible
/// calls (a dead end, possible under CO/LNS), or `max_steps`.
///
/// Fails for `n` beyond [`MAX_AGENTS`], which the bitmask sets cannot
/// hold.
pub fn random_run_with(
    protocol: Protocol,
    policy: &dyn AdmissionPolicy,
    n: usize,
    max_steps: usize,
    rng: &mut impl Rng,
) -> Result<usize> {
    if n > MAX_AGENTS {
        return Err(EstimateError::TooManyAgents(n));
    }
    let mut state = ProtocolState::initial(Distribution::initial(n), protocol);
    for step in 0..max_steps {
        if state.distribution.is_final() {
            return Ok(step);
        }
        let calls = permitted_calls(&state, policy);
        let Some(&call) = calls.choose(rng) else {
            return Ok(step);
        };
        state = state.update(call, protocol);
    }
    Ok(max_steps)
}

/// [`random_run_with`] under the protocol's built-in admission rule.
pub fn random_run(
    protocol: Protocol,
    n: usize,
    max_steps: usize,
    rng: &mut impl Rng,
) -> Result<usize> {
    let policy = policy_of(protocol)?;
    random_run_with(protocol, policy, n, max_steps, rng)
}

/// Estimate the expected call-sequence length until full expertise:
/// `runs` seeded random walks, mean and sample standard deviation.
pub fn expected_length(
    protocol: Protocol,
    n: usize,
    runs: usize,
    max_steps: usize,
    seed: u64,
) -> Result<RunStats> {
    if runs == 0 {
        return Err(EstimateError::NoRuns);
    }
    let policy = policy_of(protocol)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let lengths: Vec<usize> = (0..runs)
        .map(|_| random_run_with(protocol, policy, n, max_steps, &mut rng))
        .collect::<Result<_>>()?;

    let mean = lengths.iter().sum::<usize>() as f64 / runs as f64;
    let variance = if runs > 1 {
        lengths
            .iter()
            .map(|&l| (l as f64 - mean).powi(2))
            .sum::<f64>()
            / (runs - 1) as f64
    } else {
        0.0
    };
    Ok(RunStats {
        mean,
        stdev: variance.sqrt(),
        runs,
    })
}

/// Rough branching factor of a BFS run: explored edges per visited node.
pub fn avg_branching(transitions: u64, visited: usize) -> f64 {
    if visited == 0 {
        0.0
    } else {
        transitions as f64 / visited as f64
    }
}

fn policy_of(protocol: Protocol) -> Result<&'static dyn AdmissionPolicy> {
    protocol
        .admission()
        .ok_or(EstimateError::MissingAdmissionPolicy(protocol))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_walk_reaches_expertise_with_room_to_spare() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let len = random_run(Protocol::Any, 3, 1000, &mut rng).unwrap();
            // 3 agents need at least 3 calls and the cap is generous.
            assert!((3..1000).contains(&len));
        }
    }

    #[test]
    fn two_agents_always_need_exactly_one_call() {
        let mut rng = StdRng::seed_from_u64(11);
        for p in Protocol::BUILTIN {
            let len = random_run(p, 2, 100, &mut rng).unwrap();
            assert_eq!(len, 1, "{p}");
        }
    }

    #[test]
    fn single_agent_is_born_an_expert() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(random_run(Protocol::Any, 1, 100, &mut rng).unwrap(), 0);
    }

    #[test]
    fn co_walks_terminate_even_at_dead_ends() {
        // CO admits each pair once: at most n(n-1)/2 calls ever.
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let len = random_run(Protocol::Co, 4, 1000, &mut rng).unwrap();
            assert!(len <= 6);
        }
    }

    #[test]
    fn estimates_are_reproducible_under_a_seed() {
        let a = expected_length(Protocol::Any, 4, 200, 1000, 42).unwrap();
        let b = expected_length(Protocol::Any, 4, 200, 1000, 42).unwrap();
        assert_eq!(a, b);
        assert!(a.mean >= 4.0);
        assert!(a.stdev >= 0.0);
        assert_eq!(a.runs, 200);
    }

    #[test]
    fn atk_requires_an_explicit_policy() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            random_run(Protocol::Atk, 3, 10, &mut rng),
            Err(EstimateError::MissingAdmissionPolicy(Protocol::Atk))
        ));
        assert!(matches!(
            expected_length(Protocol::Atk, 3, 10, 10, 0),
            Err(EstimateError::MissingAdmissionPolicy(Protocol::Atk))
        ));
    }

    #[test]
    fn rejects_more_agents_than_the_sets_hold() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!(matches!(
            random_run(Protocol::Any, 17, 10, &mut rng),
            Err(EstimateError::TooManyAgents(17))
        ));
        assert!(matches!(
            expected_length(Protocol::Any, 17, 5, 10, 0),
            Err(EstimateError::TooManyAgents(17))
        ));
    }

    #[test]
    fn zero_runs_is_an_error() {
        assert!(matches!(
            expected_length(Protocol::Any, 3, 0, 10, 0),
            Err(EstimateError::NoRuns)
        ));
    }
}
