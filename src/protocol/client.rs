//! UDP Exchange
//!
//! Client side of the protocol: one connected socket per remote peer.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use super::codec::{Reply, Request, MAX_DATAGRAM, STATUS_UP};
use crate::error::{CdnError, Result};
use crate::events::{EventKind, EventSink};

// == Correlation Ids ==
/// Monotonic source of request correlation ids.
#[derive(Debug)]
pub struct IdSequence(AtomicU64);

impl IdSequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

// == Exchange ==
/// A socket connected to one resolved peer address.
///
/// Every send goes to the same address, so retries never switch peers.
#[derive(Debug)]
pub struct Exchange {
    socket: UdpSocket,
    peer: SocketAddr,
    label: String,
}

impl Exchange {
    /// Resolves `addr` once and connects an ephemeral socket to it.
    pub async fn connect(addr: &str) -> Result<Self> {
        let peer = lookup_host(addr)
            .await
            .map_err(|e| CdnError::network(addr, e))?
            .next()
            .ok_or_else(|| {
                CdnError::network(
                    addr,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "address did not resolve"),
                )
            })?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| CdnError::network(addr, e))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| CdnError::network(addr, e))?;

        Ok(Self {
            socket,
            peer,
            label: addr.to_string(),
        })
    }

    /// Resolved peer address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub async fn send(&self, request: &Request) -> Result<()> {
        self.send_bytes(&request.encode()).await
    }

    /// Sends one datagram as is.
    pub async fn send_bytes(&self, payload: &[u8]) -> Result<()> {
        self.socket
            .send(payload)
            .await
            .map_err(|e| CdnError::network(&self.label, e))?;
        Ok(())
    }

    /// Waits for the reply carrying `id`, discarding any other reply.
    ///
    /// Has no deadline of its own; wrap it in [`tokio::time::timeout`].
    /// Replies longer than [`MAX_DATAGRAM`] are discarded, never truncated.
    pub async fn recv_reply(&self, id: u64, sink: &dyn EventSink) -> Result<String> {
        // One spare byte tells an oversized reply from one that fills the buffer exactly.
        let mut buf = vec![0u8; MAX_DATAGRAM + 1];
        loop {
            let n = self
                .socket
                .recv(&mut buf)
                .await
                .map_err(|e| CdnError::network(&self.label, e))?;

            if n > MAX_DATAGRAM {
                sink.emit(
                    EventKind::MalformedReply {
                        peer: self.label.clone(),
                        reason: format!("reply exceeds {} bytes", MAX_DATAGRAM),
                    }
                    .into(),
                );
                continue;
            }

            match Reply::parse(&buf[..n]) {
                Ok(reply) if reply.id == Some(id) => return Ok(reply.value),
                Ok(reply) => sink.emit(
                    EventKind::StaleReply {
                        peer: self.label.clone(),
                        expected: id,
                        received: reply.id,
                    }
                    .into(),
                ),
                Err(e) => sink.emit(
                    EventKind::MalformedReply {
                        peer: self.label.clone(),
                        reason: e.to_string(),
                    }
                    .into(),
                ),
            }
        }
    }

    /// Sends `STATUS` and reports whether `UP` came back within `wait`.
    pub async fn probe(&self, wait: Duration) -> Result<bool> {
        self.send(&Request::Status).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        match timeout(wait, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => Ok(&buf[..n] == STATUS_UP.as_bytes()),
            Ok(Err(e)) => Err(CdnError::network(&self.label, e)),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    #[test]
    fn test_id_sequence_is_monotonic() {
        let ids = IdSequence::new();
        let a = ids.next();
        let b = ids.next();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_recv_reply_skips_stale_ids() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap().to_string();
        let exchange = Exchange::connect(&server_addr).await.unwrap();
        let sink = MemorySink::new();

        exchange.send(&Request::lookup(2, 10)).await.unwrap();
        let mut buf = [0u8; 64];
        let (_, client) = server.recv_from(&mut buf).await.unwrap();

        server.send_to(b"1:stale", client).await.unwrap();
        server.send_to(b"2:fresh", client).await.unwrap();

        let value = timeout(Duration::from_secs(2), exchange.recv_reply(2, &sink))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::StaleReply { received: Some(1), .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_recv_reply_reports_undecodable_reply() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap().to_string();
        let exchange = Exchange::connect(&server_addr).await.unwrap();
        let sink = MemorySink::new();

        exchange.send(&Request::lookup(3, 10)).await.unwrap();
        let mut buf = [0u8; 64];
        let (_, client) = server.recv_from(&mut buf).await.unwrap();

        server.send_to(&[0xff, 0xfe, 0xfd], client).await.unwrap();
        server.send_to(b"3:fresh", client).await.unwrap();

        let value = timeout(Duration::from_secs(2), exchange.recv_reply(3, &sink))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, "fresh");
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::MalformedReply { .. })),
            1
        );
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::MalformedRequest { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_recv_reply_discards_oversized_reply() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap().to_string();
        let exchange = Exchange::connect(&server_addr).await.unwrap();
        let sink = MemorySink::new();

        exchange.send(&Request::lookup(4, 10)).await.unwrap();
        let mut buf = [0u8; 64];
        let (_, client) = server.recv_from(&mut buf).await.unwrap();

        let oversized = format!("4:{}", "a".repeat(2000));
        server.send_to(oversized.as_bytes(), client).await.unwrap();

        let result = timeout(Duration::from_millis(200), exchange.recv_reply(4, &sink)).await;
        assert!(result.is_err());
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::MalformedReply { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_probe_times_out_on_silent_peer() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let exchange = Exchange::connect(&silent.local_addr().unwrap().to_string())
            .await
            .unwrap();
        let up = exchange.probe(Duration::from_millis(50)).await.unwrap();
        assert!(!up);
    }

    #[tokio::test]
    async fn test_connect_rejects_unresolvable_address() {
        let result = Exchange::connect("not-an-address").await;
        assert!(matches!(result, Err(CdnError::Network { .. })));
    }
}
