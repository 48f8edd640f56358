//! Background Tasks Module
//!
//! Long-running tasks spawned next to the services.
//!
//! # Tasks
//! - Heartbeat: periodic liveness events
//! - Forwarder: ships events to the log collector as JSON datagrams

mod forwarder;
mod heartbeat;

pub use forwarder::{spawn_forwarder, FORWARD_QUEUE_SIZE};
pub use heartbeat::spawn_heartbeat_task;
