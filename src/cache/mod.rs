//! Cache Module
//!
//! Bounded in-memory storage of origin values with pluggable eviction.

mod eviction;
mod stats;
mod store;


// Re-export public types
pub use eviction::{policy_for, EvictionPolicy, FirstScanned, RandomVictim};
pub use stats::CacheStats;
pub use store::{CacheStore, Insertion};
