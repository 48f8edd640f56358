//! Event Types
//!
//! Structured events reported by the services through an [`EventSink`](super::EventSink).

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Event Level ==
/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Liveness reported in heartbeats and probe replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    Up,
    Down,
}

// == Event Kind ==
/// Everything a service reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Node announced itself to the log pipeline
    Registration,
    /// Periodic liveness signal
    Heartbeat { status: NodeStatus },
    /// Socket bound and serving
    Listening { addr: String },
    /// Origin finished generating its keyspace
    KeyspaceGenerated { keys: u64 },
    /// Datagram could not be parsed
    MalformedRequest { peer: String, reason: String },
    /// Origin does not hold the key
    KeyNotFound { key: u64 },
    /// Reply datagram could not be sent
    ReplyFailed { peer: String, reason: String },
    /// Receive loop hit a socket error
    SocketError { reason: String },
    CacheHit { key: u64 },
    CacheMiss { key: u64 },
    /// Key stored after a successful fetch
    CacheInsert { key: u64, size: usize },
    /// Entry removed to make room
    CacheEviction { victim: u64 },
    /// Miss could not be served
    LookupFailed { key: u64 },
    /// Origin attempt timed out and will be resent
    FetchRetry {
        origin: String,
        key: u64,
        attempt: u32,
    },
    FetchSucceeded {
        origin: String,
        key: u64,
        attempt: u32,
    },
    FetchFailed {
        origin: String,
        key: u64,
        reason: String,
    },
    /// Reply whose correlation id did not match the outstanding request
    StaleReply {
        peer: String,
        expected: u64,
        received: Option<u64>,
    },
    /// Reply that was not valid text or did not fit in one datagram
    MalformedReply { peer: String, reason: String },
    DispatchAnswered {
        target: String,
        key: u64,
        value: String,
    },
    DispatchFailed {
        target: String,
        key: u64,
        reason: String,
    },
    /// Liveness probe failed, tick skipped
    TargetDown { target: String },
}

impl EventKind {
    /// Default severity for this kind of event.
    pub fn level(&self) -> EventLevel {
        match self {
            EventKind::CacheHit { .. } | EventKind::Heartbeat { .. } => EventLevel::Debug,
            EventKind::MalformedRequest { .. }
            | EventKind::KeyNotFound { .. }
            | EventKind::CacheEviction { .. }
            | EventKind::LookupFailed { .. }
            | EventKind::FetchRetry { .. }
            | EventKind::StaleReply { .. }
            | EventKind::MalformedReply { .. }
            | EventKind::DispatchFailed { .. }
            | EventKind::TargetDown { .. } => EventLevel::Warn,
            EventKind::ReplyFailed { .. }
            | EventKind::SocketError { .. }
            | EventKind::FetchFailed { .. } => EventLevel::Error,
            _ => EventLevel::Info,
        }
    }

    /// Message type used by the log pipeline.
    pub fn message_type(&self) -> &'static str {
        match self {
            EventKind::Registration => "REGISTRATION",
            EventKind::Heartbeat { .. } => "HEARTBEAT",
            _ => "LOG",
        }
    }

    /// Human readable description.
    pub fn describe(&self) -> String {
        match self {
            EventKind::Registration => "node registered".to_string(),
            EventKind::Heartbeat { status } => format!("heartbeat {:?}", status),
            EventKind::Listening { addr } => format!("listening on {}", addr),
            EventKind::KeyspaceGenerated { keys } => format!("generated {} keys", keys),
            EventKind::MalformedRequest { peer, reason } => {
                format!("dropped malformed request from {}: {}", peer, reason)
            }
            EventKind::KeyNotFound { key } => format!("key {} not found", key),
            EventKind::ReplyFailed { peer, reason } => {
                format!("failed to reply to {}: {}", peer, reason)
            }
            EventKind::SocketError { reason } => format!("socket error: {}", reason),
            EventKind::CacheHit { key } => format!("cache hit for key {}", key),
            EventKind::CacheMiss { key } => format!("cache miss for key {}", key),
            EventKind::CacheInsert { key, size } => {
                format!("added key {} to cache ({} entries)", key, size)
            }
            EventKind::CacheEviction { victim } => format!("evicted key {}", victim),
            EventKind::LookupFailed { key } => {
                format!("key {} not found in cache or origin", key)
            }
            EventKind::FetchRetry {
                origin,
                key,
                attempt,
            } => format!(
                "timeout waiting for {} on key {} (attempt {}), retrying",
                origin, key, attempt
            ),
            EventKind::FetchSucceeded {
                origin,
                key,
                attempt,
            } => format!("fetched key {} from {} on attempt {}", key, origin, attempt),
            EventKind::FetchFailed {
                origin,
                key,
                reason,
            } => format!("failed to fetch key {} from {}: {}", key, origin, reason),
            EventKind::StaleReply {
                peer,
                expected,
                received,
            } => format!(
                "discarded reply from {} with id {:?}, expected {}",
                peer, received, expected
            ),
            EventKind::MalformedReply { peer, reason } => {
                format!("discarded malformed reply from {}: {}", peer, reason)
            }
            EventKind::DispatchAnswered { target, key, value } => {
                format!("{} answered key {} with {}", target, key, value)
            }
            EventKind::DispatchFailed {
                target,
                key,
                reason,
            } => format!("{} failed key {}: {}", target, key, reason),
            EventKind::TargetDown { target } => format!("{} is down, skipping", target),
        }
    }
}

// == Event ==
/// A timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            at: Utc::now(),
        }
    }

    pub fn level(&self) -> EventLevel {
        self.kind.level()
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Event::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(EventKind::CacheHit { key: 1 }.level(), EventLevel::Debug);
        assert_eq!(EventKind::CacheMiss { key: 1 }.level(), EventLevel::Info);
        assert_eq!(EventKind::KeyNotFound { key: 1 }.level(), EventLevel::Warn);
        assert_eq!(
            EventKind::SocketError {
                reason: "x".into()
            }
            .level(),
            EventLevel::Error
        );
    }

    #[test]
    fn test_message_types() {
        assert_eq!(EventKind::Registration.message_type(), "REGISTRATION");
        assert_eq!(
            EventKind::Heartbeat {
                status: NodeStatus::Up
            }
            .message_type(),
            "HEARTBEAT"
        );
        assert_eq!(EventKind::CacheHit { key: 3 }.message_type(), "LOG");
    }

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let json = serde_json::to_value(EventKind::CacheEviction { victim: 42 }).unwrap();
        assert_eq!(json["type"], "cache_eviction");
        assert_eq!(json["victim"], 42);

        let json = serde_json::to_value(EventKind::Heartbeat {
            status: NodeStatus::Up,
        })
        .unwrap();
        assert_eq!(json["status"], "UP");
    }

    #[test]
    fn test_describe_mentions_key() {
        let text = EventKind::FetchRetry {
            origin: "127.0.0.1:7777".into(),
            key: 42,
            attempt: 2,
        }
        .describe();
        assert!(text.contains("42"));
        assert!(text.contains("attempt 2"));
    }
}
