//! Call-admission protocols.
//!
//! A protocol decides, against the *pre-call* state, which of the
//! `n·(n−1)` ordered calls are admissible. The five built-in policies:
//!
//! - `ANY` — every call, always.
//! - `CO`  — "call once": the unordered pair must not have spoken yet.
//! - `LNS` — "learn new secrets": pair unseen AND the caller would
//!           learn something from the callee.
//! - `TOK` — the caller must hold a call-initiation token.
//! - `SPI` — like TOK for admission, but being *called* destroys the
//!           callee's token permanently.
//!
//! `ATK` is a reserved name whose rule set is an extension point: the
//! name parses and an engine can be built for it, but running requires
//! an explicitly supplied [`AdmissionPolicy`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::{Call, ProtocolState};

/// The fixed set of protocol names accepted by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Any,
    Co,
    Lns,
    Tok,
    Spi,
    /// Reserved extension point; has no built-in admission rule.
    Atk,
}

/// Raised when a protocol name outside the fixed set is parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown protocol: {0} (expected ANY, CO, LNS, TOK, SPI or ATK)")]
pub struct ParseProtocolError(pub String);

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANY" => Ok(Protocol::Any),
            "CO" => Ok(Protocol::Co),
            "LNS" => Ok(Protocol::Lns),
            "TOK" => Ok(Protocol::Tok),
            "SPI" => Ok(Protocol::Spi),
            "ATK" => Ok(Protocol::Atk),
            other => Err(ParseProtocolError(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Any => "ANY",
            Protocol::Co => "CO",
            Protocol::Lns => "LNS",
            Protocol::Tok => "TOK",
            Protocol::Spi => "SPI",
            Protocol::Atk => "ATK",
        };
        f.write_str(name)
    }
}

impl Protocol {
    /// All protocols with a built-in admission rule.
    pub const BUILTIN: [Protocol; 5] = [
        Protocol::Any,
        Protocol::Co,
        Protocol::Lns,
        Protocol::Tok,
        Protocol::Spi,
    ];

    /// Whether the initial state hands every agent a token.
    pub fn uses_tokens(self) -> bool {
        matches!(self, Protocol::Tok | Protocol::Spi)
    }

    /// Whether a behaviorally equivalent state can be rebuilt from a
    /// canonical key alone.
    ///
    /// Only ANY qualifies: its admission rule reads nothing but the
    /// distribution, which the key preserves. Every other protocol
    /// depends on tokens or call history that keys discard.
    pub fn keys_only_safe(self) -> bool {
        matches!(self, Protocol::Any)
    }

    /// Built-in admission policy, if this protocol has one.
    ///
    /// `ATK` returns `None`; callers must supply their own policy.
    pub fn admission(self) -> Option<&'static dyn AdmissionPolicy> {
        match self {
            Protocol::Any => Some(&AdmitAlways),
            Protocol::Co => Some(&AdmitUnseenPair),
            Protocol::Lns => Some(&AdmitLearnNew),
            Protocol::Tok => Some(&AdmitTokenHolder),
            Protocol::Spi => Some(&AdmitTokenHolder),
            Protocol::Atk => None,
        }
    }
}

/// A call-admission rule, evaluated against the pre-call state.
///
/// Implemented by the built-in policies and by external `ATK`
/// extensions.
pub trait AdmissionPolicy: Send + Sync {
    fn admits(&self, state: &ProtocolState, call: Call) -> bool;
}

struct AdmitAlways;

impl AdmissionPolicy for AdmitAlways {
    fn admits(&self, _state: &ProtocolState, _call: Call) -> bool {
        true
    }
}

struct AdmitUnseenPair;

impl AdmissionPolicy for AdmitUnseenPair {
    fn admits(&self, state: &ProtocolState, call: Call) -> bool {
        !state.called_pairs.contains(call.caller, call.callee)
    }
}

struct AdmitLearnNew;

impl AdmissionPolicy for AdmitLearnNew {
    fn admits(&self, state: &ProtocolState, call: Call) -> bool {
        if state.called_pairs.contains(call.caller, call.callee) {
            return false;
        }
        let caller = state.distribution.secrets_of(call.caller);
        let callee = state.distribution.secrets_of(call.callee);
        // The caller must stand to learn something new.
        !callee.is_subset(caller)
    }
}

struct AdmitTokenHolder;

impl AdmissionPolicy for AdmitTokenHolder {
    fn admits(&self, state: &ProtocolState, call: Call) -> bool {
        state.tokens.contains(call.caller)
    }
}

/// Every ordered pair of distinct agents: the `n·(n−1)` call candidates.
pub fn possible_calls(n: usize) -> impl Iterator<Item = Call> {
    let n = n as crate::Agent;
    (0..n).flat_map(move |a| (0..n).filter(move |&b| b != a).map(move |b| Call::new(a, b)))
}

/// The calls the given policy admits in `state`, in candidate order.
pub fn permitted_calls(state: &ProtocolState, policy: &dyn AdmissionPolicy) -> Vec<Call> {
    possible_calls(state.distribution.n())
        .filter(|&c| policy.admits(state, c))
        .collect()
}
