//! Level-synchronous parallel BFS on a rayon worker pool.
//!
//! The pool is built once per run and reused for every depth. Each
//! depth is a hard barrier: the frontier is split into batches, all
//! batches are expanded on the pool, and only after every batch has
//! returned does the orchestrating thread merge keys into the global
//! `visited`/`layers` state and assemble the next frontier. Workers
//! share nothing mutable; merge order is immaterial (set union), and
//! the orchestrator is the only writer.
//!
//! Three deduplication tiers apply cumulatively: per-parent, per-batch
//! (both worker-side), and global (orchestrator-side). A worker panic
//! propagates out of `ThreadPool::install` and aborts the run; there is
//! no retry or partial checkpoint.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;

use grapevine_canonical::{CanonicalForm, CanonicalKey, Canonicalizer};
use grapevine_model::{permitted_calls, AdmissionPolicy, Distribution, Protocol, ProtocolState};

use crate::engine::{Engine, ShipMode};
use crate::error::Result;
use crate::result::BfsResult;

// Worker-side memo capacity; workers are short-lived per batch, so a
// smaller cache than the serial engine's suffices.
const BATCH_CACHE_CAPACITY: usize = 1 << 12;

/// One batch's locally-and-batch-deduplicated successors. In states
/// mode `states` pairs up with `keys` index for index; in keys-only
/// mode it is `None`.
struct BatchOutput {
    keys: Vec<CanonicalKey>,
    states: Option<Vec<ProtocolState>>,
}

enum Frontier {
    States(Vec<ProtocolState>),
    Keys(Vec<CanonicalKey>),
}

impl Frontier {
    fn len(&self) -> usize {
        match self {
            Frontier::States(s) => s.len(),
            Frontier::Keys(k) => k.len(),
        }
    }
}

pub(crate) fn run(
    engine: &Engine,
    n: usize,
    max_depth: usize,
    workers: usize,
    batch_size: usize,
    verbose: bool,
) -> Result<BfsResult> {
    crate::engine::check_agent_count(n)?;
    let policy = engine.policy()?;
    let protocol = engine.protocol();
    let form = engine.form();
    let workers = workers.max(1);
    let batch_size = batch_size.max(1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;

    let start_dist = Distribution::initial(n);
    let start_key = Canonicalizer::new(form).key_for(&start_dist);

    let mut seen = HashSet::from([start_key.clone()]);
    let mut layers: BTreeMap<usize, HashSet<_>> = BTreeMap::new();
    layers.entry(0).or_default().insert(start_key.clone());

    if max_depth == 0 {
        return Ok(BfsResult::new(layers, 0));
    }

    if verbose {
        let mode = match engine.ship() {
            ShipMode::States => "states",
            ShipMode::KeysOnly => "keys-only",
        };
        tracing::info!(%protocol, workers, batch_size, mode, "parallel run starting");
    }

    let mut frontier = match engine.ship() {
        ShipMode::States => {
            Frontier::States(vec![ProtocolState::initial(start_dist, protocol)])
        }
        ShipMode::KeysOnly => Frontier::Keys(vec![start_key]),
    };
    let mut transitions = 0u64;

    for depth in 0..max_depth {
        let frontier_len = frontier.len();
        if frontier_len == 0 {
            break;
        }
        if verbose {
            tracing::info!(depth, frontier = frontier_len, seen = seen.len(), "expanding");
        }
        let started = Instant::now();

        // Keep every worker saturated: several batches per rayon job.
        let batches = frontier_len.div_ceil(batch_size);
        let chunk = (batches / (workers * 4)).max(1);

        let outputs: Vec<BatchOutput> = match &frontier {
            Frontier::States(states) => pool.install(|| {
                states
                    .par_chunks(batch_size)
                    .with_min_len(chunk)
                    .map(|batch| expand_states(batch, protocol, policy, form))
                    .collect()
            }),
            Frontier::Keys(keys) => pool.install(|| {
                keys.par_chunks(batch_size)
                    .with_min_len(chunk)
                    .map(|batch| expand_keys(batch, protocol, policy, form))
                    .collect()
            }),
        };

        // Merge: the orchestrator alone touches `seen` and `layers`.
        let keys_mode = matches!(frontier, Frontier::Keys(_));
        let mut next_states = Vec::new();
        let mut next_keys = Vec::new();
        for output in outputs {
            transitions += output.keys.len() as u64;
            match output.states {
                Some(states) => {
                    for (key, state) in output.keys.into_iter().zip(states) {
                        if seen.insert(key.clone()) {
                            layers.entry(depth + 1).or_default().insert(key);
                            next_states.push(state);
                        }
                    }
                }
                None => {
                    for key in output.keys {
                        if seen.insert(key.clone()) {
                            layers.entry(depth + 1).or_default().insert(key.clone());
                            next_keys.push(key);
                        }
                    }
                }
            }
        }

        frontier = if keys_mode {
            Frontier::Keys(next_keys)
        } else {
            Frontier::States(next_states)
        };

        if verbose {
            tracing::info!(
                depth,
                new = frontier.len(),
                seen = seen.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "level merged"
            );
        }
    }

    Ok(BfsResult::new(layers, transitions))
}

/// Expand a batch of full states: per-parent dedup, then whole-batch
/// dedup; surviving (key, state) pairs stay aligned.
fn expand_states(
    batch: &[ProtocolState],
    protocol: Protocol,
    policy: &dyn AdmissionPolicy,
    form: CanonicalForm,
) -> BatchOutput {
    let mut canon = Canonicalizer::with_capacity(form, BATCH_CACHE_CAPACITY);
    let mut batch_seen = HashSet::new();
    let mut keys = Vec::new();
    let mut states = Vec::new();

    for parent in batch {
        let mut local_seen = HashSet::new();
        for call in permitted_calls(parent, policy) {
            let successor = parent.update(call, protocol);
            let key = canon.key_for(&successor.distribution);
            if !local_seen.insert(key.clone()) {
                continue;
            }
            if !batch_seen.insert(key.clone()) {
                continue;
            }
            keys.push(key);
            states.push(successor);
        }
    }

    BatchOutput {
        keys,
        states: Some(states),
    }
}

/// Expand a batch of bare keys: rebuild a representative state per key,
/// then proceed as in states mode. No states travel back.
fn expand_keys(
    batch: &[CanonicalKey],
    protocol: Protocol,
    policy: &dyn AdmissionPolicy,
    form: CanonicalForm,
) -> BatchOutput {
    let mut canon = Canonicalizer::with_capacity(form, BATCH_CACHE_CAPACITY);
    let mut batch_seen = HashSet::new();
    let mut keys = Vec::new();

    for parent_key in batch {
        let dist = Distribution::from_groups(parent_key.groups());
        let parent = ProtocolState::from_distribution(dist, protocol);
        let mut local_seen = HashSet::new();
        for call in permitted_calls(&parent, policy) {
            let successor = parent.update(call, protocol);
            let key = canon.key_for(&successor.distribution);
            if !local_seen.insert(key.clone()) {
                continue;
            }
            if !batch_seen.insert(key.clone()) {
                continue;
            }
            keys.push(key);
        }
    }

    BatchOutput { keys, states: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, ShipMode};

    #[test]
    fn parallel_matches_serial_for_every_builtin() {
        for p in Protocol::BUILTIN {
            let serial = Engine::new(p).bfs(4, 10).unwrap();
            let parallel = Engine::new(p).bfs_parallel(4, 10, 2, 3, false).unwrap();
            assert_eq!(
                parallel.reachable_count, serial.reachable_count,
                "{p} reachable_count"
            );
            assert_eq!(parallel.layer_sizes, serial.layer_sizes, "{p} layer_sizes");
        }
    }

    #[test]
    fn parallel_matches_serial_at_a_larger_size() {
        let serial = Engine::new(Protocol::Any).bfs(5, 3).unwrap();
        let parallel = Engine::new(Protocol::Any)
            .bfs_parallel(5, 3, 4, 8, false)
            .unwrap();
        assert_eq!(parallel.reachable_count, serial.reachable_count);
        assert_eq!(parallel.layer_sizes, serial.layer_sizes);
    }

    #[test]
    fn keys_only_agrees_with_states_shipping() {
        let states = Engine::new(Protocol::Any)
            .bfs_parallel(4, 10, 2, 4, false)
            .unwrap();
        let keys_only = Engine::new(Protocol::Any)
            .with_ship_mode(ShipMode::KeysOnly)
            .unwrap()
            .bfs_parallel(4, 10, 2, 4, false)
            .unwrap();
        assert_eq!(keys_only.reachable_count, states.reachable_count);
        assert_eq!(keys_only.layer_sizes, states.layer_sizes);
    }

    #[test]
    fn batch_dedup_only_lowers_the_transition_count() {
        let serial = Engine::new(Protocol::Tok).bfs(4, 10).unwrap();
        let parallel = Engine::new(Protocol::Tok)
            .bfs_parallel(4, 10, 3, 2, false)
            .unwrap();
        assert!(parallel.transitions > 0);
        assert!(parallel.transitions <= serial.transitions);
    }

    #[test]
    fn depth_zero_short_circuits() {
        let res = Engine::new(Protocol::Co)
            .bfs_parallel(6, 0, 4, 16, false)
            .unwrap();
        assert_eq!(res.reachable_count, 1);
        assert_eq!(res.transitions, 0);
    }

    #[test]
    fn single_worker_pool_still_terminates() {
        let res = Engine::new(Protocol::Lns)
            .bfs_parallel(4, 10, 1, 1, false)
            .unwrap();
        assert_eq!(res.reachable_count, 15);
    }
}
