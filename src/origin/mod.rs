//! Origin Module
//!
//! The authoritative store: owns the full keyspace and answers point lookups.

mod keyspace;

use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{EventKind, SharedSink};
use crate::protocol::LookupService;

pub use keyspace::Keyspace;

// == Origin Store ==
/// Lookup service over a read-only keyspace.
///
/// The keyspace never changes after construction, so concurrent handlers share it
/// without locking.
pub struct OriginStore {
    keyspace: Arc<Keyspace>,
    sink: SharedSink,
}

impl OriginStore {
    pub fn new(keyspace: Keyspace, sink: SharedSink) -> Self {
        sink.emit(
            EventKind::KeyspaceGenerated {
                keys: keyspace.len() as u64,
            }
            .into(),
        );
        Self {
            keyspace: Arc::new(keyspace),
            sink,
        }
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }
}

#[async_trait]
impl LookupService for OriginStore {
    async fn lookup(&self, key: u64) -> Option<String> {
        match self.keyspace.get(key) {
            Some(value) => Some(value.to_string()),
            None => {
                self.sink.emit(EventKind::KeyNotFound { key }.into());
                None
            }
        }
    }
}
