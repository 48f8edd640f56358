//! Heartbeat Task
//!
//! Background task that periodically reports the node as up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::events::{EventKind, NodeStatus, SharedSink};

/// Spawns a background task that emits a `Heartbeat` event every `interval_secs`.
///
/// The first heartbeat goes out one full interval after the task starts. Returns
/// `None` when `interval_secs` is zero, which disables heartbeats.
///
/// # Example
/// ```ignore
/// let heartbeat = spawn_heartbeat_task(sink.clone(), 5);
/// // Later, during shutdown:
/// if let Some(handle) = heartbeat { handle.abort(); }
/// ```
pub fn spawn_heartbeat_task(sink: SharedSink, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }
    Some(spawn_with_period(sink, Duration::from_secs(interval_secs)))
}

fn spawn_with_period(sink: SharedSink, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting heartbeat task with interval of {:?}", period);

        loop {
            tokio::time::sleep(period).await;
            sink.emit(
                EventKind::Heartbeat {
                    status: NodeStatus::Up,
                }
                .into(),
            );
        }
    })
}
