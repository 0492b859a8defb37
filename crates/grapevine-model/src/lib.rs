//! Gossip data model: agents, secrets, calls and protocol state.
//!
//! # Model
//!
//! `n` agents each start knowing exactly one secret, their own. A call
//! between two distinct agents leaves both parties knowing the union of
//! what either knew before. A *protocol* restricts which calls are
//! admissible in a given state (see [`Protocol`]).
//!
//! # Invariants
//!
//! - Agent `i` always knows secret `i`.
//! - Secret sets only grow: no call ever removes knowledge.
//! - States are immutable values; [`ProtocolState::update`] returns a
//!   new state and never mutates the old one.

mod distribution;
mod protocol;
mod sets;
mod state;

pub use distribution::Distribution;
pub use protocol::{
    permitted_calls, possible_calls, AdmissionPolicy, ParseProtocolError, Protocol,
};
pub use sets::{AgentSet, PairSet};
pub use state::{Call, ProtocolState};

/// Stable agent index, `0..n-1` for the duration of one run.
///
/// Secrets are identified by the index of their owning agent, so a set
/// of secrets is an [`AgentSet`] as well.
pub type Agent = u8;

/// Upper bound on the agent count supported by the bitmask sets.
///
/// The exact canonicalizer is factorial in `n`, so this is not the
/// practical limit; it merely sizes [`AgentSet`].
pub const MAX_AGENTS: usize = 16;
