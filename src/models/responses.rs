//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStats;
use crate::events::NodeIdentity;

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct CachedValueResponse {
    /// The requested key
    pub key: u64,
    /// The cached value
    pub value: String,
}

impl CachedValueResponse {
    pub fn new(key: u64, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Values stored after a fetch
    pub inserts: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Misses the origins could not serve
    pub fetch_failures: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Maximum number of entries
    pub capacity: usize,
    /// Active eviction policy
    pub eviction_policy: &'static str,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, capacity: usize, eviction_policy: &'static str) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            inserts: stats.inserts,
            evictions: stats.evictions,
            fetch_failures: stats.fetch_failures,
            total_entries: stats.total_entries,
            capacity,
            eviction_policy,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Node reporting
    pub node_id: Uuid,
    /// Service name of the node
    pub service: &'static str,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(identity: &NodeIdentity) -> Self {
        Self {
            status: "healthy".to_string(),
            node_id: identity.node_id,
            service: identity.role.service_name(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
