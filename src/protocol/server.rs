//! Datagram Server
//!
//! Shared receive loop for the origin and the cache node. Each datagram is handled on
//! its own task so a slow lookup never stalls reception.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::debug;

use super::codec::{Reply, Request, MAX_DATAGRAM, STATUS_UP};
use crate::error::{CdnError, Result};
use crate::events::{EventKind, SharedSink};

/// Pause after a failed receive so a persistent socket error cannot spin the loop.
pub const SOCKET_ERROR_BACKOFF: Duration = Duration::from_millis(100);

// == Lookup Service ==
/// Answers point lookups. `None` means no reply is sent.
#[async_trait]
pub trait LookupService: Send + Sync + 'static {
    async fn lookup(&self, key: u64) -> Option<String>;
}

// == Datagram Server ==
pub struct DatagramServer<S> {
    socket: Arc<UdpSocket>,
    service: Arc<S>,
    sink: SharedSink,
}

impl<S: LookupService> DatagramServer<S> {
    /// Binds the listening socket.
    pub async fn bind(addr: &str, service: Arc<S>, sink: SharedSink) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|source| CdnError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self {
            socket: Arc::new(socket),
            service,
            sink,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| CdnError::Internal(format!("socket has no local address: {}", e)))
    }

    /// Receives datagrams until the task is dropped.
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            self.sink.emit(
                EventKind::Listening {
                    addr: addr.to_string(),
                }
                .into(),
            );
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (n, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    back_off_after_error(&self.sink, e).await;
                    continue;
                }
            };
            debug!("Received {} bytes from {}", n, peer);

            let payload = buf[..n].to_vec();
            let socket = self.socket.clone();
            let service = self.service.clone();
            let sink = self.sink.clone();
            tokio::spawn(async move {
                handle_datagram(&socket, service.as_ref(), &sink, &payload, peer).await;
            });
        }
    }

    /// Runs the receive loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

async fn back_off_after_error(sink: &SharedSink, error: io::Error) {
    sink.emit(
        EventKind::SocketError {
            reason: error.to_string(),
        }
        .into(),
    );
    tokio::time::sleep(SOCKET_ERROR_BACKOFF).await;
}

/// Parses one datagram, performs the lookup and replies when there is a value.
async fn handle_datagram<S: LookupService>(
    socket: &UdpSocket,
    service: &S,
    sink: &SharedSink,
    payload: &[u8],
    peer: SocketAddr,
) {
    let reply = match Request::parse(payload) {
        Ok(Request::Status) => STATUS_UP.as_bytes().to_vec(),
        Ok(Request::Lookup { id, key }) => match service.lookup(key).await {
            Some(value) if !value.is_empty() => Reply::new(id, value).encode(),
            _ => return,
        },
        Err(e) => {
            sink.emit(
                EventKind::MalformedRequest {
                    peer: peer.to_string(),
                    reason: e.to_string(),
                }
                .into(),
            );
            return;
        }
    };

    if let Err(e) = socket.send_to(&reply, peer).await {
        sink.emit(
            EventKind::ReplyFailed {
                peer: peer.to_string(),
                reason: e.to_string(),
            }
            .into(),
        );
    }
}
