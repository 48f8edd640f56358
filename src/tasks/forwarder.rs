//! Collector Forwarder
//!
//! Drains the collector queue and sends each event as one JSON datagram.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{Event, LogRecord, NodeIdentity};
use crate::protocol::Exchange;

/// Capacity of the queue between `CollectorSink` and the forwarder.
pub const FORWARD_QUEUE_SIZE: usize = 1024;

/// Spawns the task that ships queued events to `collector_addr`.
///
/// The task ends when every sender is dropped, or right away if the collector
/// address cannot be resolved. Send failures are logged and the event discarded.
pub fn spawn_forwarder(
    mut rx: mpsc::Receiver<Event>,
    identity: NodeIdentity,
    collector_addr: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let exchange = match Exchange::connect(&collector_addr).await {
            Ok(exchange) => exchange,
            Err(e) => {
                warn!("Event forwarding disabled: {}", e);
                return;
            }
        };
        info!("Forwarding events to collector at {}", exchange.peer());

        while let Some(event) = rx.recv().await {
            let payload = match LogRecord::new(&identity, &event).to_bytes() {
                Ok(payload) => payload,
                Err(e) => {
                    debug!("Could not serialize event: {}", e);
                    continue;
                }
            };
            if let Err(e) = exchange.send_bytes(&payload).await {
                debug!("Collector send failed: {}", e);
            }
        }
    })
}
