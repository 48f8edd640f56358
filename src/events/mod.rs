//! Events Module
//!
//! Structured service events and the sinks that receive them.

mod event;
mod record;
mod sink;

use serde::Serialize;
use uuid::Uuid;

use crate::config::ServiceRole;

pub use event::{Event, EventKind, EventLevel, NodeStatus};
pub use record::LogRecord;
pub use sink::{CollectorSink, EventSink, FanoutSink, MemorySink, SharedSink, TracingSink};

// == Node Identity ==
/// Identity stamped on everything a process reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub node_id: Uuid,
    pub role: ServiceRole,
}

impl NodeIdentity {
    /// Creates an identity with a fresh node id.
    pub fn new(role: ServiceRole) -> Self {
        Self {
            node_id: Uuid::now_v7(),
            role,
        }
    }
}
