//! Origin Fetch
//!
//! Fetch-through client: round-robin origin selection with timeout-only retries.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::error::{CdnError, Result};
use crate::events::{EventKind, SharedSink};
use crate::protocol::{Exchange, IdSequence, Request};
use crate::rotation::RoundRobin;

// == Origin Source ==
/// Where a cache node gets values it does not hold.
#[async_trait]
pub trait OriginSource: Send + Sync + 'static {
    async fn fetch(&self, key: u64) -> Result<String>;
}

// == Retry Policy ==
/// Attempt budget for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends, including the first
    pub attempts: u32,
    /// Wait for a reply after each send
    pub per_attempt: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            per_attempt: Duration::from_secs(6),
        }
    }
}

// == Origin Client ==
/// Fetches keys from the configured origins over UDP.
pub struct OriginClient {
    origins: RoundRobin<String>,
    retry: RetryPolicy,
    ids: IdSequence,
    sink: SharedSink,
}

impl OriginClient {
    /// Fails when `origins` is empty.
    pub fn new(origins: Vec<String>, retry: RetryPolicy, sink: SharedSink) -> Result<Self> {
        Ok(Self {
            origins: RoundRobin::new(origins)?,
            retry,
            ids: IdSequence::new(),
            sink,
        })
    }

    /// Contacts one origin, resending to it on timeout only.
    async fn fetch_from(&self, origin: &str, key: u64) -> Result<String> {
        let exchange = Exchange::connect(origin).await?;
        let id = self.ids.next();
        let request = Request::lookup(id, key);

        for attempt in 1..=self.retry.attempts {
            exchange.send(&request).await?;

            match timeout(
                self.retry.per_attempt,
                exchange.recv_reply(id, self.sink.as_ref()),
            )
            .await
            {
                Ok(Ok(value)) if value.is_empty() => {
                    return Err(CdnError::EmptyReply {
                        peer: origin.to_string(),
                    });
                }
                Ok(Ok(value)) => {
                    self.sink.emit(
                        EventKind::FetchSucceeded {
                            origin: origin.to_string(),
                            key,
                            attempt,
                        }
                        .into(),
                    );
                    return Ok(value);
                }
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => {
                    if attempt < self.retry.attempts {
                        self.sink.emit(
                            EventKind::FetchRetry {
                                origin: origin.to_string(),
                                key,
                                attempt,
                            }
                            .into(),
                        );
                    }
                }
            }
        }

        Err(CdnError::OriginTimeout {
            origin: origin.to_string(),
            attempts: self.retry.attempts,
        })
    }
}

#[async_trait]
impl OriginSource for OriginClient {
    /// Fetches `key` from the next origin in rotation.
    ///
    /// The cursor advances on every call whatever the outcome, so consecutive
    /// fetches spread across origins even when one of them is down.
    async fn fetch(&self, key: u64) -> Result<String> {
        let origin = self.origins.next();
        let result = self.fetch_from(&origin, key).await;
        if let Err(e) = &result {
            self.sink.emit(
                EventKind::FetchFailed {
                    origin,
                    key,
                    reason: e.to_string(),
                }
                .into(),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use std::sync::Arc;
    use tokio::net::UdpSocket;

    fn quick_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            per_attempt: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 6);
        assert_eq!(policy.per_attempt, Duration::from_secs(6));
    }

    #[test]
    fn test_client_needs_origins() {
        let sink = Arc::new(MemorySink::new());
        let result = OriginClient::new(Vec::new(), RetryPolicy::default(), sink);
        assert!(matches!(result, Err(CdnError::Config(_))));
    }

    #[tokio::test]
    async fn test_reply_after_first_timeout_succeeds() {
        let origin = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = origin.local_addr().unwrap().to_string();
        let sink = Arc::new(MemorySink::new());
        let client = OriginClient::new(vec![addr], quick_retry(3), sink.clone()).unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            // Ignore the first attempt, answer the second.
            origin.recv_from(&mut buf).await.unwrap();
            let (n, peer) = origin.recv_from(&mut buf).await.unwrap();
            let request = Request::parse(&buf[..n]).unwrap();
            let id = match request {
                Request::Lookup { id: Some(id), key: 42 } => id,
                other => panic!("unexpected request {:?}", other),
            };
            origin
                .send_to(format!("{}:abc1234567", id).as_bytes(), peer)
                .await
                .unwrap();
        });

        let value = client.fetch(42).await.unwrap();
        responder.await.unwrap();

        assert_eq!(value, "abc1234567");
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::FetchRetry { attempt: 1, .. })),
            1
        );
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::FetchSucceeded { attempt: 2, .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_oversized_reply_is_never_returned_truncated() {
        let origin = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = origin.local_addr().unwrap().to_string();
        let sink = Arc::new(MemorySink::new());
        let client = OriginClient::new(vec![addr], quick_retry(1), sink.clone()).unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, peer) = origin.recv_from(&mut buf).await.unwrap();
            if let Ok(Request::Lookup { id: Some(id), .. }) = Request::parse(&buf[..n]) {
                let reply = format!("{}:{}", id, "a".repeat(2000));
                let _ = origin.send_to(reply.as_bytes(), peer).await;
            }
        });

        let result = client.fetch(42).await;

        assert!(matches!(
            result,
            Err(CdnError::OriginTimeout { attempts: 1, .. })
        ));
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::MalformedReply { .. })),
            1
        );
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::FetchSucceeded { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_empty_reply_is_failure() {
        let origin = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = origin.local_addr().unwrap().to_string();
        let client =
            OriginClient::new(vec![addr], quick_retry(3), Arc::new(MemorySink::new())).unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, peer) = origin.recv_from(&mut buf).await.unwrap();
            if let Ok(Request::Lookup { id: Some(id), .. }) = Request::parse(&buf[..n]) {
                let _ = origin.send_to(format!("{}:", id).as_bytes(), peer).await;
            }
        });

        let result = client.fetch(1).await;
        assert!(matches!(result, Err(CdnError::EmptyReply { .. })));
    }

    #[tokio::test]
    async fn test_unresolvable_origin_fails_without_retry() {
        let sink = Arc::new(MemorySink::new());
        let client = OriginClient::new(
            vec!["no-port-here".to_string()],
            quick_retry(6),
            sink.clone(),
        )
        .unwrap();

        let result = client.fetch(1).await;

        assert!(matches!(result, Err(CdnError::Network { .. })));
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::FetchRetry { .. })),
            0
        );
        assert_eq!(
            sink.count(|e| matches!(e.kind, EventKind::FetchFailed { .. })),
            1
        );
    }
}
