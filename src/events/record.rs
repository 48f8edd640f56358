//! Log Record
//!
//! JSON shape shipped to the log collector.

use serde::Serialize;
use uuid::Uuid;

use super::{Event, EventKind, EventLevel, NodeIdentity};

/// One collector datagram.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord<'a> {
    pub log_id: Uuid,
    pub node_id: Uuid,
    pub service_name: &'static str,
    pub log_level: EventLevel,
    pub message_type: &'static str,
    pub message: String,
    pub event: &'a EventKind,
    pub timestamp: String,
}

impl<'a> LogRecord<'a> {
    pub fn new(identity: &NodeIdentity, event: &'a Event) -> Self {
        Self {
            log_id: Uuid::now_v7(),
            node_id: identity.node_id,
            service_name: identity.role.service_name(),
            log_level: event.level(),
            message_type: event.kind.message_type(),
            message: event.kind.describe(),
            event: &event.kind,
            timestamp: event.at.to_rfc3339(),
        }
    }

    /// Serialized datagram payload.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
