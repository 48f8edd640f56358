//! Cache Node Module
//!
//! Serves cached values and fetches through to an origin on a miss.

mod fetch;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::{CacheStore, Insertion};
use crate::events::{EventKind, SharedSink};
use crate::protocol::LookupService;

pub use fetch::{OriginClient, OriginSource, RetryPolicy};

// == Cache Node ==
/// Bounded cache in front of one or more origins.
///
/// The store lock is held for the hit check and again for the insert, never across
/// the origin round trip.
pub struct CacheNode {
    store: Arc<RwLock<CacheStore>>,
    origin: Arc<dyn OriginSource>,
    sink: SharedSink,
}

impl CacheNode {
    pub fn new(store: CacheStore, origin: Arc<dyn OriginSource>, sink: SharedSink) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            origin,
            sink,
        }
    }

    /// Shared handle to the store, used by the admin API.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        self.store.clone()
    }

    /// Returns the value for `key`, fetching and caching it on a miss.
    ///
    /// `None` when the origin could not supply a non-empty value.
    pub async fn lookup(&self, key: u64) -> Option<String> {
        // Write lock: hit/miss counters change even on reads.
        let cached = self.store.write().await.get(key);
        if let Ok(value) = cached {
            self.sink.emit(EventKind::CacheHit { key }.into());
            return Some(value);
        }
        self.sink.emit(EventKind::CacheMiss { key }.into());

        let value = match self.origin.fetch(key).await {
            Ok(value) if !value.is_empty() => value,
            _ => {
                self.store.write().await.record_fetch_failure();
                self.sink.emit(EventKind::LookupFailed { key }.into());
                return None;
            }
        };

        let outcome = {
            let mut store = self.store.write().await;
            store
                .insert(key, value.clone())
                .map(|insertion| (insertion, store.len()))
        };
        match outcome {
            Ok((Insertion::Stored { evicted }, size)) => {
                if let Some(victim) = evicted {
                    self.sink.emit(EventKind::CacheEviction { victim }.into());
                }
                self.sink.emit(EventKind::CacheInsert { key, size }.into());
            }
            Ok((Insertion::AlreadyPresent, _)) => {}
            Err(e) => warn!(key, "Fetched value not cached: {}", e),
        }

        Some(value)
    }
}

#[async_trait]
impl LookupService for CacheNode {
    async fn lookup(&self, key: u64) -> Option<String> {
        CacheNode::lookup(self, key).await
    }
}
