//! Breadth-first enumeration of reachable gossip states.
//!
//! The [`Engine`] explores, level by level, every protocol state
//! reachable from the all-singletons start, counting states up to
//! agent relabeling: each successor distribution is collapsed to a
//! canonical key and all deduplication happens on keys.
//!
//! # Serial vs parallel
//!
//! [`Engine::bfs`] is the single-threaded reference. [`Engine::
//! bfs_parallel`] expands each depth's frontier on a rayon worker pool
//! with a hard per-depth barrier: depth d+1 starts only after every
//! batch of depth d has returned and been merged. Both must agree on
//! `reachable_count` and `layer_sizes`; the `transitions` counter of
//! the parallel engine under-counts raw edge traversals because batch
//! deduplication happens before the orchestrator sees the keys.
//!
//! # Shipping modes
//!
//! Workers normally receive full states ([`ShipMode::States`]). Under
//! ANY — the one protocol whose admission reads nothing but the
//! distribution — the frontier can instead ship bare canonical keys
//! and rebuild representative states worker-side
//! ([`ShipMode::KeysOnly`]). Requesting keys-only for any other
//! protocol is an error, not a fallback.

mod engine;
mod error;
mod parallel;
mod result;

pub use engine::{Engine, ShipMode};
pub use error::{EngineError, Result};
pub use result::BfsResult;
