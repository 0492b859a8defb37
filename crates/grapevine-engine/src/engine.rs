//! Engine construction and the serial reference BFS.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use grapevine_canonical::{CanonicalForm, Canonicalizer};
use grapevine_model::{permitted_calls, AdmissionPolicy, Distribution, Protocol, ProtocolState};

use crate::error::{EngineError, Result};
use crate::parallel;
use crate::result::BfsResult;

/// How the parallel engine ships a frontier to the workers.
/// Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShipMode {
    /// Workers receive full protocol states. Always safe.
    #[default]
    States,
    /// Workers receive bare canonical keys and rebuild a representative
    /// state locally. Only sound for protocols whose admission rules
    /// read nothing a key discards; see [`Protocol::keys_only_safe`].
    KeysOnly,
}

/// Enumerates reachable gossip states under one protocol.
pub struct Engine {
    protocol: Protocol,
    policy: Option<Arc<dyn AdmissionPolicy>>,
    form: CanonicalForm,
    ship: ShipMode,
}

impl Engine {
    /// Engine with the protocol's built-in admission rule, the exact
    /// canonical form and states shipping. ATK engines are constructed
    /// successfully but cannot run until [`Engine::with_admission`]
    /// supplies a rule.
    pub fn new(protocol: Protocol) -> Engine {
        Engine {
            protocol,
            policy: None,
            form: CanonicalForm::Exact,
            ship: ShipMode::States,
        }
    }

    /// Engine from a protocol name; unknown names fail here, before
    /// any exploration starts.
    pub fn from_name(name: &str) -> Result<Engine> {
        Ok(Engine::new(name.parse::<Protocol>()?))
    }

    /// Replace the admission rule (required for ATK).
    pub fn with_admission(mut self, policy: Arc<dyn AdmissionPolicy>) -> Engine {
        self.policy = Some(policy);
        self
    }

    /// Select the canonicalization strategy. The heuristic form is an
    /// explicitly caveated performance mode; counts it produces may
    /// differ from the exact form's.
    pub fn with_canonical_form(mut self, form: CanonicalForm) -> Engine {
        self.form = form;
        self
    }

    /// Select the parallel shipping mode. Keys-only is rejected for
    /// protocols that cannot rebuild state from a key.
    pub fn with_ship_mode(mut self, ship: ShipMode) -> Result<Engine> {
        if ship == ShipMode::KeysOnly && !self.protocol.keys_only_safe() {
            return Err(EngineError::KeysOnlyUnsupported(self.protocol));
        }
        self.ship = ship;
        Ok(self)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub(crate) fn form(&self) -> CanonicalForm {
        self.form
    }

    pub(crate) fn ship(&self) -> ShipMode {
        self.ship
    }

    /// The admission rule this engine runs with.
    pub(crate) fn policy(&self) -> Result<&dyn AdmissionPolicy> {
        if let Some(policy) = &self.policy {
            return Ok(policy.as_ref());
        }
        self.protocol
            .admission()
            .ok_or(EngineError::MissingAdmissionPolicy(self.protocol))
    }

    /// Single-threaded breadth-first exploration, the reference
    /// semantics for the parallel engine.
    ///
    /// Within one parent's successor set duplicate keys are dropped
    /// before counting; each surviving successor increments
    /// `transitions` exactly once, whether or not its key is globally
    /// new. `max_depth == 0` short-circuits to the initial layer.
    ///
    /// Fails for `n` beyond [`grapevine_model::MAX_AGENTS`].
    pub fn bfs(&self, n: usize, max_depth: usize) -> Result<BfsResult> {
        check_agent_count(n)?;
        let policy = self.policy()?;
        let mut canon = Canonicalizer::new(self.form);

        let start_dist = Distribution::initial(n);
        let start_key = canon.key_for(&start_dist);
        let root = ProtocolState::initial(start_dist, self.protocol);

        let mut seen = HashSet::from([start_key.clone()]);
        let mut layers: BTreeMap<usize, HashSet<_>> = BTreeMap::new();
        layers.entry(0).or_default().insert(start_key);

        if max_depth == 0 {
            return Ok(BfsResult::new(layers, 0));
        }

        let mut transitions = 0u64;
        let mut queue = VecDeque::from([(root, 0usize)]);
        while let Some((state, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            let mut local_seen = HashSet::new();
            for call in permitted_calls(&state, policy) {
                let successor = state.update(call, self.protocol);
                let key = canon.key_for(&successor.distribution);
                if !local_seen.insert(key.clone()) {
                    continue;
                }
                transitions += 1;
                if seen.insert(key.clone()) {
                    layers.entry(depth + 1).or_default().insert(key);
                    queue.push_back((successor, depth + 1));
                }
            }
        }

        Ok(BfsResult::new(layers, transitions))
    }

    /// Level-synchronous parallel exploration; see [`parallel`].
    ///
    /// Agrees with [`Engine::bfs`] on `reachable_count` and
    /// `layer_sizes`. `verbose` controls per-depth progress logging
    /// only, never semantics.
    pub fn bfs_parallel(
        &self,
        n: usize,
        max_depth: usize,
        workers: usize,
        batch_size: usize,
        verbose: bool,
    ) -> Result<BfsResult> {
        parallel::run(self, n, max_depth, workers, batch_size, verbose)
    }
}

/// The bitmask sets hold at most [`MAX_AGENTS`] members; larger `n`
/// would silently alias agents in release builds, so it is an error on
/// every run path.
///
/// [`MAX_AGENTS`]: grapevine_model::MAX_AGENTS
pub(crate) fn check_agent_count(n: usize) -> Result<()> {
    if n > grapevine_model::MAX_AGENTS {
        return Err(EngineError::TooManyAgents(n));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grapevine_model::Call;

    #[test]
    fn unknown_name_fails_construction() {
        assert!(matches!(
            Engine::from_name("GOSSIP"),
            Err(EngineError::UnknownProtocol(_))
        ));
        assert!(Engine::from_name("LNS").is_ok());
    }

    #[test]
    fn depth_zero_is_the_singleton_initial_layer() {
        for p in Protocol::BUILTIN {
            let res = Engine::new(p).bfs(5, 0).unwrap();
            assert_eq!(res.reachable_count, 1, "{p}");
            assert_eq!(res.layers[&0].len(), 1);
            assert_eq!(res.transitions, 0);
        }
    }

    #[test]
    fn two_agents_reach_two_states() {
        for p in Protocol::BUILTIN {
            let res = Engine::new(p).bfs(2, 10).unwrap();
            assert_eq!(res.reachable_count, 2, "{p}");
        }
    }

    #[test]
    fn three_agents_reach_four_states() {
        for p in Protocol::BUILTIN {
            let res = Engine::new(p).bfs(3, 10).unwrap();
            assert_eq!(res.reachable_count, 4, "{p}");
        }
    }

    #[test]
    fn four_agent_reference_counts() {
        let expected = [
            (Protocol::Lns, 15),
            (Protocol::Co, 15),
            (Protocol::Spi, 16),
            (Protocol::Tok, 16),
            (Protocol::Any, 16),
        ];
        for (p, count) in expected {
            let res = Engine::new(p).bfs(4, 10).unwrap();
            assert_eq!(res.reachable_count, count, "{p}");
        }
    }

    #[test]
    fn layer_sizes_sum_to_reachable_count() {
        for p in Protocol::BUILTIN {
            let res = Engine::new(p).bfs(4, 3).unwrap();
            let sum: usize = res.layer_sizes.values().sum();
            assert_eq!(sum, res.reachable_count, "{p}");
            assert_eq!(res.per_level().iter().sum::<usize>(), res.reachable_count);
        }
    }

    #[test]
    fn atk_runs_only_with_an_explicit_policy() {
        let engine = Engine::new(Protocol::Atk);
        assert!(matches!(
            engine.bfs(3, 2),
            Err(EngineError::MissingAdmissionPolicy(Protocol::Atk))
        ));

        // An ATK rule that only lets agent 0 dial: still a valid
        // exploration, just a sparse one.
        struct ZeroDials;
        impl AdmissionPolicy for ZeroDials {
            fn admits(&self, _state: &ProtocolState, call: Call) -> bool {
                call.caller == 0
            }
        }
        let res = Engine::new(Protocol::Atk)
            .with_admission(Arc::new(ZeroDials))
            .bfs(3, 10)
            .unwrap();
        assert!(res.reachable_count >= 2);
    }

    #[test]
    fn keys_only_rejected_for_token_and_history_protocols() {
        for p in [Protocol::Co, Protocol::Lns, Protocol::Tok, Protocol::Spi] {
            assert!(matches!(
                Engine::new(p).with_ship_mode(ShipMode::KeysOnly),
                Err(EngineError::KeysOnlyUnsupported(_))
            ));
        }
        assert!(Engine::new(Protocol::Any)
            .with_ship_mode(ShipMode::KeysOnly)
            .is_ok());
    }

    #[test]
    fn rejects_more_agents_than_the_sets_hold() {
        // 17 agents would overflow the u16 bitmask; both traversals
        // must refuse up front instead of aliasing agent 16 onto 0.
        let engine = Engine::new(Protocol::Any);
        assert!(matches!(
            engine.bfs(17, 2),
            Err(EngineError::TooManyAgents(17))
        ));
        assert!(matches!(
            engine.bfs_parallel(17, 2, 2, 4, false),
            Err(EngineError::TooManyAgents(17))
        ));
        // The boundary itself is accepted. Heuristic form: the exact
        // canonicalizer is factorial and 16! is not a unit test.
        let boundary = Engine::new(Protocol::Any)
            .with_canonical_form(CanonicalForm::Heuristic { shape_patch: false })
            .bfs(grapevine_model::MAX_AGENTS, 0);
        assert!(boundary.is_ok());
    }

    #[test]
    fn noop_calls_create_no_new_states() {
        // ANY keeps admitting the same pair after they have merged;
        // the exploration must still terminate at the exact counts.
        let res = Engine::new(Protocol::Any).bfs(2, 50).unwrap();
        assert_eq!(res.reachable_count, 2);
        // Depth 2 and beyond discover nothing new.
        assert!(res.layer_sizes.keys().all(|&d| d <= 1));
    }
}
