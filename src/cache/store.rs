//! Cache Store Module
//!
//! Bounded key/value storage with a pluggable eviction policy.

use std::collections::HashMap;

use crate::cache::{CacheStats, EvictionPolicy, FirstScanned};
use crate::error::{CdnError, Result};

/// Outcome of [`CacheStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// Key stored, possibly after evicting `evicted`
    Stored { evicted: Option<u64> },
    /// Key was already cached; the existing value is kept
    AlreadyPresent,
}

// == Cache Store ==
/// Bounded cache of origin values.
///
/// Holds at most `capacity` entries once any operation returns.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<u64, String>,
    /// Victim selection when full
    policy: Box<dyn EvictionPolicy>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store that evicts the first scanned key when full.
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, Box::new(FirstScanned))
    }

    pub fn with_policy(capacity: usize, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            policy,
            stats: CacheStats::new(),
            capacity,
        }
    }

    // == Get ==
    /// Retrieves a value, counting the hit or miss.
    pub fn get(&mut self, key: u64) -> Result<String> {
        match self.entries.get(&key) {
            Some(value) => {
                self.stats.record_hit();
                Ok(value.clone())
            }
            None => {
                self.stats.record_miss();
                Err(CdnError::NotFound(key))
            }
        }
    }

    // == Peek ==
    /// Retrieves a value without touching statistics.
    pub fn peek(&self, key: u64) -> Option<&String> {
        self.entries.get(&key)
    }

    // == Insert ==
    /// Stores a fetched value.
    ///
    /// A new key arriving at capacity first evicts exactly one entry chosen by the
    /// policy. A key that is already cached is left untouched.
    pub fn insert(&mut self, key: u64, value: String) -> Result<Insertion> {
        if self.entries.contains_key(&key) {
            return Ok(Insertion::AlreadyPresent);
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            let victim = self
                .policy
                .pick_victim(&self.entries)
                .filter(|victim| self.entries.remove(victim).is_some());
            match victim {
                Some(victim) => {
                    self.stats.record_eviction();
                    evicted = Some(victim);
                }
                None => {
                    return Err(CdnError::CacheFull(format!(
                        "{} policy found no entry to evict",
                        self.policy.name()
                    )));
                }
            }
        }

        self.entries.insert(key, value);
        self.stats.record_insert();
        self.stats.set_total_entries(self.entries.len());

        Ok(Insertion::Stored { evicted })
    }

    /// Counts a miss that could not be fetched.
    pub fn record_fetch_failure(&mut self) {
        self.stats.record_fetch_failure();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Cached keys in ascending order.
    pub fn keys(&self) -> Vec<u64> {
        let mut keys: Vec<u64> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
