//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheStore;
use crate::error::{CdnError, Result};
use crate::events::NodeIdentity;
use crate::models::{CachedValueResponse, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// Holds the same store the cache node serves from, so the admin view is live.
#[derive(Clone)]
pub struct AdminState {
    /// Identity reported by /health
    pub identity: NodeIdentity,
    /// Thread-safe cache store
    pub cache: Arc<RwLock<CacheStore>>,
}

impl AdminState {
    pub fn new(identity: NodeIdentity, cache: Arc<RwLock<CacheStore>>) -> Self {
        Self { identity, cache }
    }
}

/// Handler for GET /cache/:key
///
/// Returns the cached value without fetching from an origin and without
/// counting a hit or miss.
pub async fn peek_handler(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<Json<CachedValueResponse>> {
    let key: u64 = key
        .trim()
        .parse()
        .map_err(|_| CdnError::MalformedRequest(format!("key '{}' is not a number", key)))?;

    // Read lock is enough: peek leaves the statistics alone
    let cache = state.cache.read().await;
    let value = cache.peek(key).ok_or(CdnError::NotFound(key))?;

    Ok(Json(CachedValueResponse::new(key, value.clone())))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AdminState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    let stats = cache.stats();

    Json(StatsResponse::new(
        &stats,
        cache.capacity(),
        cache.policy_name(),
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AdminState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(&state.identity))
}
