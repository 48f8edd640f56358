//! CDN Sim - A small content-delivery network over UDP
//!
//! Runs one of the three services per process:
//! `cdn_sim origin|cache|router [listen-addr]`.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cdn_sim::api::{create_router, AdminState};
use cdn_sim::cache::{policy_for, CacheStore};
use cdn_sim::cache_node::{CacheNode, OriginClient, RetryPolicy};
use cdn_sim::events::{
    CollectorSink, EventKind, FanoutSink, NodeIdentity, SharedSink, TracingSink,
};
use cdn_sim::origin::{Keyspace, OriginStore};
use cdn_sim::protocol::DatagramServer;
use cdn_sim::router::{Router, RouterSettings};
use cdn_sim::tasks::{spawn_forwarder, spawn_heartbeat_task, FORWARD_QUEUE_SIZE};
use cdn_sim::{Config, ServerRegistry, ServiceRole};

const USAGE: &str = "usage: cdn_sim <origin|cache|router> [listen-addr]";

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Parse the role and load configuration from environment variables
/// 3. Build the event sinks, register the node and start the heartbeat
/// 4. Run the chosen service until Ctrl+C or SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdn_sim=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (role, listen_override) = parse_args(env::args().skip(1))?;

    let mut config = Config::from_env();
    if listen_override.is_some() {
        config.listen_addr = listen_override;
    }
    config.validate().context("invalid configuration")?;

    let identity = NodeIdentity::new(role);
    info!(
        "Starting {} with node id {}",
        role.service_name(),
        identity.node_id
    );

    let (sink, forwarder) = build_sink(identity, &config);
    sink.emit(EventKind::Registration.into());

    let mut background: Vec<JoinHandle<()>> = forwarder.into_iter().collect();
    background.extend(spawn_heartbeat_task(sink.clone(), config.heartbeat_interval));

    let result = match role {
        ServiceRole::Origin => run_origin(&config, sink).await,
        ServiceRole::Cache => run_cache(&config, identity, sink).await,
        ServiceRole::Router => run_router(&config, sink).await,
    };

    for handle in background {
        handle.abort();
    }
    info!("Shutdown complete");
    result
}

/// Reads the role and optional listen address from the command line.
fn parse_args<I>(mut args: I) -> anyhow::Result<(ServiceRole, Option<String>)>
where
    I: Iterator<Item = String>,
{
    let role = match args.next() {
        Some(role) => role.parse::<ServiceRole>().context(USAGE)?,
        None => bail!(USAGE),
    };
    let listen = args.next();
    if args.next().is_some() {
        bail!(USAGE);
    }
    Ok((role, listen))
}

/// Tracing sink, plus the collector queue and its forwarder when configured.
fn build_sink(identity: NodeIdentity, config: &Config) -> (SharedSink, Option<JoinHandle<()>>) {
    let tracing_sink: SharedSink = Arc::new(TracingSink::new(identity));

    match &config.collector_addr {
        Some(addr) => {
            let (tx, rx) = mpsc::channel(FORWARD_QUEUE_SIZE);
            let forwarder = spawn_forwarder(rx, identity, addr.clone());
            let fanout = FanoutSink::new(vec![tracing_sink, Arc::new(CollectorSink::new(tx))]);
            (Arc::new(fanout), Some(forwarder))
        }
        None => (tracing_sink, None),
    }
}

async fn run_origin(config: &Config, sink: SharedSink) -> anyhow::Result<()> {
    let keyspace = Keyspace::generate(config.keyspace_size, config.value_length, &mut rand::rng());
    let store = Arc::new(OriginStore::new(keyspace, sink.clone()));

    let addr = config.listen_addr_for(ServiceRole::Origin);
    let server = DatagramServer::bind(&addr, store, sink)
        .await
        .context("origin could not open its socket")?;
    let handle = server.spawn();

    shutdown_signal().await;
    handle.abort();
    Ok(())
}

async fn run_cache(
    config: &Config,
    identity: NodeIdentity,
    sink: SharedSink,
) -> anyhow::Result<()> {
    let registry = ServerRegistry::load(&config.servers_file)
        .with_context(|| format!("failed to load {}", config.servers_file))?;
    let origins = registry.origins()?.to_vec();
    info!("Cache node using {} origin(s)", origins.len());

    let retry = RetryPolicy {
        attempts: config.origin_attempts,
        per_attempt: config.origin_timeout(),
    };
    let client = OriginClient::new(origins, retry, sink.clone())?;
    let store = CacheStore::with_policy(config.cache_capacity, policy_for(config.eviction_kind()?));
    info!(
        "Cache store initialized: capacity={}, eviction={}",
        store.capacity(),
        store.policy_name()
    );
    let node = Arc::new(CacheNode::new(store, Arc::new(client), sink.clone()));

    let addr = config.listen_addr_for(ServiceRole::Cache);
    let server = DatagramServer::bind(&addr, node.clone(), sink)
        .await
        .context("cache node could not open its socket")?;
    let handle = server.spawn();

    match config.admin_port {
        Some(port) => {
            let app = create_router(AdminState::new(identity, node.store()));
            let admin_addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(admin_addr)
                .await
                .with_context(|| format!("failed to bind admin port {}", port))?;
            info!("Admin API listening on http://{}", admin_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("admin server failed")?;
        }
        None => shutdown_signal().await,
    }

    handle.abort();
    Ok(())
}

async fn run_router(config: &Config, sink: SharedSink) -> anyhow::Result<()> {
    let registry = ServerRegistry::load(&config.servers_file)
        .with_context(|| format!("failed to load {}", config.servers_file))?;
    let caches = registry.caches()?.to_vec();

    let router = Arc::new(Router::new(
        caches,
        RouterSettings::from_config(config),
        sink,
    )?);
    let settings = router.settings();
    info!(
        "Router timeout={:?}, probe={}, keyspace={}",
        settings.timeout, settings.probe, settings.keyspace_size
    );
    let handle = router.clone().spawn();

    shutdown_signal().await;
    handle.abort();

    let stats = router.stats();
    info!(
        answered = stats.answered,
        failed = stats.failed,
        skipped = stats.skipped,
        "Router stopped: {}",
        serde_json::to_string(&stats.selections).unwrap_or_default()
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
    warn!("Stopping background tasks");
}
