//! Canonical keys for secret distributions.
//!
//! Two distributions describe the same reachable state iff one is the
//! other with agents renamed. The canonicalizer collapses that symmetry
//! into a single representative key, so the engines can deduplicate by
//! plain key equality.
//!
//! # Two forms, not interchangeable
//!
//! - [`CanonicalForm::Exact`] minimizes over all `n!` relabelings. This
//!   is the trusted reference: keys are equal iff the distributions are
//!   isomorphic. Cost O(n!·n log n); fine for n ≤ ~9.
//! - [`CanonicalForm::Heuristic`] is an O(n log n) sort-and-renumber
//!   fast path. It is known to occasionally *merge* non-isomorphic
//!   distributions (a documented 4-agent SPI case loses one bucket) and
//!   carries a narrow shape-specific patch for exactly that case. Use
//!   it only as an explicit, opt-in performance mode; never mix keys
//!   from the two forms in one run.

mod cache;
mod exact;
mod heuristic;
mod key;

pub use cache::KeyCache;
pub use exact::exact_key;
pub use heuristic::heuristic_key;
pub use key::CanonicalKey;

use grapevine_model::{Distribution, Protocol};

/// Which canonicalization strategy a run uses. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalForm {
    /// Full permutation search; reference semantics.
    #[default]
    Exact,
    /// Sort-and-renumber fast path; may under-count, see module docs.
    /// `shape_patch` enables the narrow 4-agent SPI discriminator.
    Heuristic { shape_patch: bool },
}

impl CanonicalForm {
    /// The heuristic form configured for `protocol`: the shape patch is
    /// enabled exactly for the protocol it was observed for (SPI).
    pub fn heuristic_for(protocol: Protocol) -> Self {
        CanonicalForm::Heuristic {
            shape_patch: protocol == Protocol::Spi,
        }
    }
}

/// Computes canonical keys through a bounded memo cache.
///
/// The cache is owned by the canonicalizer, never process-global, and
/// uses a full-flush eviction policy: when it reaches capacity it is
/// cleared and refills. BFS re-canonicalizes the same distributions
/// heavily within a depth, which a recently-filled cache captures well.
#[derive(Debug)]
pub struct Canonicalizer {
    form: CanonicalForm,
    cache: KeyCache,
}

/// Default memo capacity, in distributions.
pub const DEFAULT_CACHE_CAPACITY: usize = 1 << 16;

impl Canonicalizer {
    pub fn new(form: CanonicalForm) -> Self {
        Self::with_capacity(form, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(form: CanonicalForm, capacity: usize) -> Self {
        Canonicalizer {
            form,
            cache: KeyCache::new(capacity),
        }
    }

    pub fn form(&self) -> CanonicalForm {
        self.form
    }

    /// The canonical key of `dist` under this canonicalizer's form.
    pub fn key_for(&mut self, dist: &Distribution) -> CanonicalKey {
        if let Some(key) = self.cache.get(dist) {
            return key.clone();
        }
        let key = match self.form {
            CanonicalForm::Exact => exact_key(dist),
            CanonicalForm::Heuristic { shape_patch } => heuristic_key(dist, shape_patch),
        };
        self.cache.insert(dist.clone(), key.clone());
        key
    }
}
