//! CDN Sim - A small content-delivery network over UDP
//!
//! An origin store holding the full keyspace, bounded cache nodes that fetch through
//! to it on a miss, and a router that spreads synthetic lookups across the caches.

pub mod api;
pub mod cache;
pub mod cache_node;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod origin;
pub mod protocol;
pub mod registry;
pub mod rotation;
pub mod router;
pub mod tasks;

pub use api::AdminState;
pub use cache_node::CacheNode;
pub use config::{Config, ServiceRole};
pub use error::{CdnError, Result};
pub use origin::OriginStore;
pub use registry::ServerRegistry;
pub use router::Router;
pub use tasks::{spawn_forwarder, spawn_heartbeat_task};
