//! Router Module
//!
//! Load generator: sends one synthetic lookup per tick to the cache nodes in turn.

mod stats;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::info;

use crate::config::Config;
use crate::error::{CdnError, Result};
use crate::events::{EventKind, SharedSink};
use crate::protocol::{Exchange, IdSequence, Request};
use crate::rotation::RoundRobin;

pub use stats::RouterStats;

// == Settings ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterSettings {
    /// Time between dispatches
    pub interval: Duration,
    /// Wait for a reply, and for the probe's `UP`
    pub timeout: Duration,
    /// Send `STATUS` before each dispatch
    pub probe: bool,
    /// Synthetic keys are drawn from `0..keyspace_size`
    pub keyspace_size: u64,
}

impl RouterSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.router_interval(),
            timeout: config.router_timeout(),
            probe: config.router_probe,
            keyspace_size: config.keyspace_size,
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(6),
            probe: false,
            keyspace_size: 100_000,
        }
    }
}

// == Dispatch Outcome ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Answered { value: String },
    Failed { reason: String },
    /// Probe did not get `UP`; nothing was sent
    Skipped,
}

// == Router ==
pub struct Router {
    targets: RoundRobin<String>,
    settings: RouterSettings,
    ids: IdSequence,
    rng: Mutex<StdRng>,
    stats: Mutex<RouterStats>,
    sink: SharedSink,
}

impl Router {
    /// Fails when `targets` is empty or the keyspace is zero.
    pub fn new(targets: Vec<String>, settings: RouterSettings, sink: SharedSink) -> Result<Self> {
        Self::with_rng(targets, settings, sink, StdRng::from_os_rng())
    }

    /// Same as [`Router::new`] with a fixed key sequence.
    pub fn seeded(
        targets: Vec<String>,
        settings: RouterSettings,
        sink: SharedSink,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(targets, settings, sink, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        targets: Vec<String>,
        settings: RouterSettings,
        sink: SharedSink,
        rng: StdRng,
    ) -> Result<Self> {
        if settings.keyspace_size == 0 {
            return Err(CdnError::Config(
                "router keyspace must not be empty".to_string(),
            ));
        }
        Ok(Self {
            targets: RoundRobin::new(targets)?,
            settings,
            ids: IdSequence::new(),
            rng: Mutex::new(rng),
            stats: Mutex::new(RouterStats::new()),
            sink,
        })
    }

    pub fn settings(&self) -> RouterSettings {
        self.settings
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> RouterStats {
        self.lock_stats().clone()
    }

    /// Next synthetic key, modulo the keyspace.
    pub fn next_key(&self) -> u64 {
        let raw: u64 = self.rng.lock().unwrap_or_else(PoisonError::into_inner).random();
        raw % self.settings.keyspace_size
    }

    /// Sends `key` to the next target and waits for the outcome.
    pub async fn dispatch_once(&self, key: u64) -> DispatchOutcome {
        let target = self.select();
        self.dispatch_to(&target, key).await
    }

    /// Dispatches once per tick until the task is dropped.
    ///
    /// Each dispatch runs on its own task; the target is chosen on the tick itself so
    /// rotation order does not depend on how long replies take.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Router dispatching to {} cache node(s) every {:?}",
            self.targets.len(),
            self.settings.interval
        );

        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let target = self.select();
            let key = self.next_key();
            let router = self.clone();
            tokio::spawn(async move {
                router.dispatch_to(&target, key).await;
            });
        }
    }

    /// Runs the dispatch loop on its own task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn select(&self) -> String {
        let target = self.targets.next();
        self.lock_stats().record_selection(&target);
        target
    }

    async fn dispatch_to(&self, target: &str, key: u64) -> DispatchOutcome {
        let outcome = match self.exchange(target, key).await {
            Ok(Some(value)) => DispatchOutcome::Answered { value },
            Ok(None) => DispatchOutcome::Skipped,
            Err(e) => DispatchOutcome::Failed {
                reason: e.to_string(),
            },
        };

        let event = match &outcome {
            DispatchOutcome::Answered { value } => {
                self.lock_stats().record_answered();
                EventKind::DispatchAnswered {
                    target: target.to_string(),
                    key,
                    value: value.clone(),
                }
            }
            DispatchOutcome::Failed { reason } => {
                self.lock_stats().record_failed();
                EventKind::DispatchFailed {
                    target: target.to_string(),
                    key,
                    reason: reason.clone(),
                }
            }
            DispatchOutcome::Skipped => {
                self.lock_stats().record_skipped();
                EventKind::TargetDown {
                    target: target.to_string(),
                }
            }
        };
        self.sink.emit(event.into());

        outcome
    }

    /// `Ok(None)` when the probe fails.
    async fn exchange(&self, target: &str, key: u64) -> Result<Option<String>> {
        let exchange = Exchange::connect(target).await?;

        if self.settings.probe && !exchange.probe(self.settings.timeout).await.unwrap_or(false) {
            return Ok(None);
        }

        let id = self.ids.next();
        exchange.send(&Request::lookup(id, key)).await?;
        match timeout(
            self.settings.timeout,
            exchange.recv_reply(id, self.sink.as_ref()),
        )
        .await
        {
            Ok(reply) => reply.map(Some),
            Err(_) => Err(CdnError::Timeout {
                peer: target.to_string(),
            }),
        }
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, RouterStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
