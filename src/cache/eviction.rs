//! Eviction Policies
//!
//! Strategies that choose which entry leaves a full cache.
//!
//! None of the policies here is least-recently-used. The cache keeps no access history;
//! a policy only sees the current set of entries.

use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EvictionKind;

// == Eviction Policy Trait ==
/// Chooses one victim among the current entries.
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    /// Returns the key to evict, or `None` when there is nothing to evict.
    fn pick_victim(&mut self, entries: &HashMap<u64, String>) -> Option<u64>;

    fn name(&self) -> &'static str;
}

/// Builds the policy selected in configuration.
pub fn policy_for(kind: EvictionKind) -> Box<dyn EvictionPolicy> {
    match kind {
        EvictionKind::FirstScanned => Box::new(FirstScanned),
        EvictionKind::Random => Box::new(RandomVictim::new()),
    }
}

// == First Scanned ==
/// Evicts whichever key the map yields first.
///
/// The choice follows `HashMap` iteration order: arbitrary but not random, and unrelated
/// to insertion or access order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstScanned;

impl EvictionPolicy for FirstScanned {
    fn pick_victim(&mut self, entries: &HashMap<u64, String>) -> Option<u64> {
        entries.keys().next().copied()
    }

    fn name(&self) -> &'static str {
        "first"
    }
}

// == Random Victim ==
/// Evicts a uniformly random key.
pub struct RandomVictim {
    rng: StdRng,
}

impl RandomVictim {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomVictim {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomVictim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomVictim").finish_non_exhaustive()
    }
}

impl EvictionPolicy for RandomVictim {
    fn pick_victim(&mut self, entries: &HashMap<u64, String>) -> Option<u64> {
        if entries.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..entries.len());
        entries.keys().nth(index).copied()
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
