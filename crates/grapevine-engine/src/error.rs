//! Error types for the engines.

use grapevine_model::{ParseProtocolError, Protocol, MAX_AGENTS};
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur constructing or running an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Protocol name outside the fixed set
    #[error(transparent)]
    UnknownProtocol(#[from] ParseProtocolError),

    /// Agent count beyond what the bitmask sets can hold
    #[error("n = {0} exceeds the supported maximum of {max} agents", max = MAX_AGENTS)]
    TooManyAgents(usize),

    /// ATK run without an explicitly supplied admission policy
    #[error("protocol {0} has no built-in admission rule; supply one with Engine::with_admission")]
    MissingAdmissionPolicy(Protocol),

    /// Keys-only shipping requested for a protocol whose state cannot
    /// be rebuilt from a canonical key
    #[error("keys-only shipping is unsound for {0}: its admission rules read state a canonical key discards")]
    KeysOnlyUnsupported(Protocol),

    /// Worker pool construction failed
    #[error("worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
