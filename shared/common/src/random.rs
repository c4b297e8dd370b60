//! Deterministic random generator helpers.
//!
//! The engine owns its RNG directly rather than reaching for a process-global mutex: this module
//! only provides the seeding helper and the `SmallRng` re-export that `Engine` threads through
//! every randomized decision.

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Builds the single deterministic generator the engine seeds at construction/reset.
pub fn seeded_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

pub trait SmallRngExt {
    /// Seeds from the thread's entropy source, for callers (tests, tools) that don't care about
    /// reproducing a trace.
    fn new_quick() -> SmallRng;
}

impl SmallRngExt for SmallRng {
    fn new_quick() -> SmallRng {
        SmallRng::from_entropy()
    }
}
