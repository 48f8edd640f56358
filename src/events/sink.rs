//! Event Sinks
//!
//! Fire-and-forget destinations for service events. Emitting never fails and never
//! blocks request handling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{Event, EventLevel, NodeIdentity};

// == Event Sink Trait ==
/// Narrow reporting interface injected into every component.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn EventSink>;

// == Tracing Sink ==
/// Renders events as tracing records.
#[derive(Debug, Clone)]
pub struct TracingSink {
    identity: NodeIdentity,
}

impl TracingSink {
    pub fn new(identity: NodeIdentity) -> Self {
        Self { identity }
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let node_id = self.identity.node_id;
        let service = self.identity.role.service_name();
        let message = event.kind.describe();

        match event.level() {
            EventLevel::Debug => debug!(%node_id, service, "{}", message),
            EventLevel::Info => info!(%node_id, service, "{}", message),
            EventLevel::Warn => warn!(%node_id, service, "{}", message),
            EventLevel::Error => error!(%node_id, service, "{}", message),
        }
    }
}

// == Memory Sink ==
/// Keeps every event in memory. Used to assert on reported events.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Event) -> bool,
    {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| predicate(e))
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

// == Fanout Sink ==
/// Forwards every event to several sinks.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<SharedSink>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: Event) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

// == Collector Sink ==
/// Queues events for the forwarder task, dropping them when the queue is full.
#[derive(Debug)]
pub struct CollectorSink {
    tx: mpsc::Sender<Event>,
    dropped: AtomicU64,
}

impl CollectorSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self {
            tx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Events discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: Event) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
