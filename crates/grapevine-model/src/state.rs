//! Protocol state: a distribution plus the bookkeeping protocols need.

use crate::sets::{AgentSet, PairSet};
use crate::{Agent, Distribution, Protocol};

/// One call: `caller` rings `callee`. Knowledge transfer is
/// direction-free; direction matters only for admission checks and
/// token bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Call {
    pub caller: Agent,
    pub callee: Agent,
}

impl Call {
    pub fn new(caller: Agent, callee: Agent) -> Self {
        debug_assert_ne!(caller, callee);
        Call { caller, callee }
    }
}

/// A [`Distribution`] plus protocol-specific auxiliary state.
///
/// `tokens` is meaningful for TOK/SPI (empty otherwise); `called_pairs`
/// is consulted by CO/LNS but maintained under every protocol, so a
/// state can be re-interpreted under another policy without replaying
/// its history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolState {
    pub distribution: Distribution,
    pub tokens: AgentSet,
    pub called_pairs: PairSet,
}

impl ProtocolState {
    /// Root state for a fresh run: under TOK/SPI every agent starts
    /// holding a call-initiation token.
    pub fn initial(distribution: Distribution, protocol: Protocol) -> Self {
        let tokens = if protocol.uses_tokens() {
            AgentSet::full(distribution.n())
        } else {
            AgentSet::EMPTY
        };
        ProtocolState {
            distribution,
            tokens,
            called_pairs: PairSet::EMPTY,
        }
    }

    /// Rebuild a representative state from a bare distribution, as a
    /// keys-only worker does after decoding a canonical key.
    ///
    /// Sound only for protocols whose admission rules read nothing but
    /// the distribution (see [`Protocol::keys_only_safe`]).
    pub fn from_distribution(distribution: Distribution, protocol: Protocol) -> Self {
        Self::initial(distribution, protocol)
    }

    /// Apply one admitted call, returning the successor state.
    ///
    /// Always: knowledge union plus `called_pairs` recording. TOK: the
    /// caller's token (if any) moves to the callee. SPI: being called
    /// destroys the callee's token permanently.
    pub fn update(&self, call: Call, protocol: Protocol) -> ProtocolState {
        let distribution = self.distribution.apply_call(call);

        let mut tokens = self.tokens;
        match protocol {
            Protocol::Tok => {
                if tokens.contains(call.caller) {
                    tokens.remove(call.caller);
                    tokens.insert(call.callee);
                }
            }
            Protocol::Spi => {
                tokens.remove(call.callee);
            }
            _ => {}
        }

        let mut called_pairs = self.called_pairs;
        called_pairs.insert(call.caller, call.callee);

        ProtocolState {
            distribution,
            tokens,
            called_pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initial(protocol: Protocol, n: usize) -> ProtocolState {
        ProtocolState::initial(Distribution::initial(n), protocol)
    }

    #[test]
    fn token_protocols_start_fully_tokened() {
        let st = initial(Protocol::Tok, 4);
        assert_eq!(st.tokens.len(), 4);
        let st = initial(Protocol::Spi, 4);
        assert_eq!(st.tokens.len(), 4);
        let st = initial(Protocol::Any, 4);
        assert!(st.tokens.is_empty());
    }

    #[test]
    fn tok_moves_the_callers_token() {
        let st = initial(Protocol::Tok, 3).update(Call::new(0, 1), Protocol::Tok);
        // Agent 0 handed its token to agent 1, who already held one;
        // membership is presence-only, so the count drops to 2.
        assert!(!st.tokens.contains(0));
        assert!(st.tokens.contains(1));
        assert!(st.tokens.contains(2));
        assert_eq!(st.tokens.len(), 2);
    }

    #[test]
    fn spi_destroys_the_callees_token() {
        let st = initial(Protocol::Spi, 3).update(Call::new(0, 1), Protocol::Spi);
        assert!(st.tokens.contains(0));
        assert!(!st.tokens.contains(1));
        assert!(st.tokens.contains(2));
    }

    #[test]
    fn called_pairs_recorded_under_every_protocol() {
        for p in [Protocol::Any, Protocol::Co, Protocol::Lns, Protocol::Tok, Protocol::Spi] {
            let st = initial(p, 3).update(Call::new(2, 1), p);
            assert!(st.called_pairs.contains(1, 2), "{p} lost the pair record");
        }
    }

    #[test]
    fn called_pairs_grow_along_a_chain() {
        let p = Protocol::Co;
        let s0 = initial(p, 4);
        let s1 = s0.update(Call::new(0, 1), p);
        let s2 = s1.update(Call::new(2, 3), p);
        assert_eq!(s1.called_pairs.len(), 1);
        assert_eq!(s2.called_pairs.len(), 2);
        assert!(s2.called_pairs.contains(0, 1));
        assert!(s2.called_pairs.contains(2, 3));
    }

    #[test]
    fn update_does_not_mutate_the_parent() {
        let s0 = initial(Protocol::Tok, 3);
        let _ = s0.update(Call::new(0, 1), Protocol::Tok);
        assert_eq!(s0.tokens.len(), 3);
        assert!(s0.called_pairs.is_empty());
    }
}
