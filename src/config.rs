//! Configuration Module
//!
//! Handles loading and validating service configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{CdnError, Result};
use crate::protocol::MAX_DATAGRAM;

/// Longest origin value that still fits in a reply datagram behind a `<u64 id>:` prefix.
pub const MAX_VALUE_LENGTH: usize = MAX_DATAGRAM - (U64_DIGITS + 1);

const U64_DIGITS: usize = 20;

// == Service Role ==
/// Which of the three services this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRole {
    Origin,
    Cache,
    Router,
}

impl ServiceRole {
    /// Service name used in events and log records.
    pub fn service_name(&self) -> &'static str {
        match self {
            ServiceRole::Origin => "origin_server",
            ServiceRole::Cache => "cache_server",
            ServiceRole::Router => "router",
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

impl FromStr for ServiceRole {
    type Err = CdnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "origin" => Ok(ServiceRole::Origin),
            "cache" => Ok(ServiceRole::Cache),
            "router" => Ok(ServiceRole::Router),
            other => Err(CdnError::Config(format!(
                "unknown role '{}', expected origin, cache or router",
                other
            ))),
        }
    }
}

// == Eviction Policy Kind ==
/// Eviction strategy selected through `EVICTION_POLICY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionKind {
    /// First key met while scanning the map
    FirstScanned,
    /// Uniformly random key
    Random,
}

impl FromStr for EvictionKind {
    type Err = CdnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(EvictionKind::FirstScanned),
            "random" => Ok(EvictionKind::Random),
            other => Err(CdnError::Config(format!(
                "unknown eviction policy '{}', expected first or random",
                other
            ))),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the servers file listing origin and cache addresses
    pub servers_file: String,
    /// UDP listen address override; role defaults apply when unset
    pub listen_addr: Option<String>,
    /// Number of keys generated by the origin
    pub keyspace_size: u64,
    /// Length of each generated origin value
    pub value_length: usize,
    /// Maximum number of entries a cache node holds
    pub cache_capacity: usize,
    /// Raw eviction policy name
    pub eviction_policy: String,
    /// Per-attempt origin fetch timeout in milliseconds
    pub origin_timeout_ms: u64,
    /// Total attempts per origin fetch
    pub origin_attempts: u32,
    /// Router dispatch interval in milliseconds
    pub router_interval_ms: u64,
    /// Router reply timeout in milliseconds
    pub router_timeout_ms: u64,
    /// Probe cache nodes with STATUS before dispatching
    pub router_probe: bool,
    /// Cache-node admin HTTP port
    pub admin_port: Option<u16>,
    /// Log collector UDP address
    pub collector_addr: Option<String>,
    /// Heartbeat interval in seconds, 0 disables
    pub heartbeat_interval: u64,
    /// Variables that were set but could not be parsed
    pub invalid_vars: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CDN_SERVERS_FILE` - Servers file (default: servers.txt)
    /// - `CDN_LISTEN_ADDR` - UDP listen address (default: per role)
    /// - `KEYSPACE_SIZE` - Origin keys (default: 100000)
    /// - `VALUE_LENGTH` - Origin value length (default: 10)
    /// - `CACHE_CAPACITY` - Cache entries (default: 1000)
    /// - `EVICTION_POLICY` - `first` or `random` (default: first)
    /// - `ORIGIN_TIMEOUT_MS` - Per-attempt origin timeout (default: 6000)
    /// - `ORIGIN_ATTEMPTS` - Attempts per origin fetch (default: 6)
    /// - `ROUTER_INTERVAL_MS` - Dispatch tick (default: 1000)
    /// - `ROUTER_TIMEOUT_MS` - Dispatch reply timeout (default: 6000)
    /// - `ROUTER_PROBE` - Liveness probe before dispatch (default: false)
    /// - `ADMIN_PORT` - Cache-node admin HTTP port (default: disabled)
    /// - `COLLECTOR_ADDR` - Log collector address (default: disabled)
    /// - `HEARTBEAT_INTERVAL` - Heartbeat seconds (default: 5)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut invalid = Vec::new();

        Self {
            servers_file: lookup("CDN_SERVERS_FILE").unwrap_or(defaults.servers_file),
            listen_addr: lookup("CDN_LISTEN_ADDR").filter(|v| !v.trim().is_empty()),
            keyspace_size: parse_var(&lookup, "KEYSPACE_SIZE", &mut invalid)
                .unwrap_or(defaults.keyspace_size),
            value_length: parse_var(&lookup, "VALUE_LENGTH", &mut invalid)
                .unwrap_or(defaults.value_length),
            cache_capacity: parse_var(&lookup, "CACHE_CAPACITY", &mut invalid)
                .unwrap_or(defaults.cache_capacity),
            eviction_policy: lookup("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
            origin_timeout_ms: parse_var(&lookup, "ORIGIN_TIMEOUT_MS", &mut invalid)
                .unwrap_or(defaults.origin_timeout_ms),
            origin_attempts: parse_var(&lookup, "ORIGIN_ATTEMPTS", &mut invalid)
                .unwrap_or(defaults.origin_attempts),
            router_interval_ms: parse_var(&lookup, "ROUTER_INTERVAL_MS", &mut invalid)
                .unwrap_or(defaults.router_interval_ms),
            router_timeout_ms: parse_var(&lookup, "ROUTER_TIMEOUT_MS", &mut invalid)
                .unwrap_or(defaults.router_timeout_ms),
            router_probe: parse_var(&lookup, "ROUTER_PROBE", &mut invalid)
                .unwrap_or(defaults.router_probe),
            admin_port: parse_var(&lookup, "ADMIN_PORT", &mut invalid),
            collector_addr: lookup("COLLECTOR_ADDR").filter(|v| !v.trim().is_empty()),
            heartbeat_interval: parse_var(&lookup, "HEARTBEAT_INTERVAL", &mut invalid)
                .unwrap_or(defaults.heartbeat_interval),
            invalid_vars: invalid,
        }
    }

    /// Rejects settings no service can run with.
    pub fn validate(&self) -> Result<()> {
        if !self.invalid_vars.is_empty() {
            return Err(CdnError::Config(format!(
                "unparseable value for {}",
                self.invalid_vars.join(", ")
            )));
        }

        let non_zero = [
            ("KEYSPACE_SIZE", self.keyspace_size),
            ("VALUE_LENGTH", self.value_length as u64),
            ("CACHE_CAPACITY", self.cache_capacity as u64),
            ("ORIGIN_TIMEOUT_MS", self.origin_timeout_ms),
            ("ORIGIN_ATTEMPTS", u64::from(self.origin_attempts)),
            ("ROUTER_INTERVAL_MS", self.router_interval_ms),
            ("ROUTER_TIMEOUT_MS", self.router_timeout_ms),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(CdnError::Config(format!("{} must be greater than zero", name)));
            }
        }
        if self.value_length > MAX_VALUE_LENGTH {
            return Err(CdnError::Config(format!(
                "VALUE_LENGTH must be at most {} to fit in one datagram",
                MAX_VALUE_LENGTH
            )));
        }
        self.eviction_kind()?;
        Ok(())
    }

    /// Parsed eviction policy.
    pub fn eviction_kind(&self) -> Result<EvictionKind> {
        self.eviction_policy.parse()
    }

    /// Listen address for `role`, honouring the override.
    pub fn listen_addr_for(&self, role: ServiceRole) -> String {
        if let Some(addr) = &self.listen_addr {
            return addr.clone();
        }
        match role {
            ServiceRole::Origin => "0.0.0.0:7777".to_string(),
            ServiceRole::Cache => "0.0.0.0:8080".to_string(),
            ServiceRole::Router => "0.0.0.0:0".to_string(),
        }
    }

    pub fn origin_timeout(&self) -> Duration {
        Duration::from_millis(self.origin_timeout_ms)
    }

    pub fn router_interval(&self) -> Duration {
        Duration::from_millis(self.router_interval_ms)
    }

    pub fn router_timeout(&self) -> Duration {
        Duration::from_millis(self.router_timeout_ms)
    }
}

/// Parses a variable. Unset or blank gives `None`; an unparseable value also
/// gives `None` and is recorded in `invalid`.
fn parse_var<T, F>(lookup: &F, name: &str, invalid: &mut Vec<String>) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            invalid.push(name.to_string());
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers_file: "servers.txt".to_string(),
            listen_addr: None,
            keyspace_size: 100_000,
            value_length: 10,
            cache_capacity: 1000,
            eviction_policy: "first".to_string(),
            origin_timeout_ms: 6000,
            origin_attempts: 6,
            router_interval_ms: 1000,
            router_timeout_ms: 6000,
            router_probe: false,
            admin_port: None,
            collector_addr: None,
            heartbeat_interval: 5,
            invalid_vars: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.keyspace_size, 100_000);
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.origin_attempts, 6);
        assert_eq!(config.origin_timeout(), Duration::from_secs(6));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_empty_lookup_uses_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.servers_file, "servers.txt");
        assert_eq!(config.value_length, 10);
        assert_eq!(config.router_interval(), Duration::from_secs(1));
        assert!(config.admin_port.is_none());
        assert!(config.collector_addr.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CACHE_CAPACITY", "2"),
            ("ORIGIN_ATTEMPTS", "3"),
            ("ROUTER_PROBE", "true"),
            ("ADMIN_PORT", "9090"),
            ("EVICTION_POLICY", "random"),
        ]));
        assert_eq!(config.cache_capacity, 2);
        assert_eq!(config.origin_attempts, 3);
        assert!(config.router_probe);
        assert_eq!(config.admin_port, Some(9090));
        assert_eq!(config.eviction_kind().unwrap(), EvictionKind::Random);
    }

    #[test]
    fn test_unparseable_values_are_fatal() {
        let config = Config::from_lookup(lookup_from(&[
            ("KEYSPACE_SIZE", "lots"),
            ("ROUTER_PROBE", "maybe"),
        ]));
        assert_eq!(config.keyspace_size, 100_000);
        assert_eq!(config.invalid_vars, vec!["KEYSPACE_SIZE", "ROUTER_PROBE"]);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("KEYSPACE_SIZE"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = Config::from_lookup(lookup_from(&[("CACHE_CAPACITY", "  ")]));
        assert_eq!(config.cache_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_value_longer_than_datagram() {
        let fits = Config {
            value_length: MAX_VALUE_LENGTH,
            ..Config::default()
        };
        assert!(fits.validate().is_ok());

        let too_long = Config {
            value_length: 2000,
            ..Config::default()
        };
        assert!(matches!(too_long.validate(), Err(CdnError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CdnError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_policy() {
        let config = Config {
            eviction_policy: "lru".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CdnError::Config(_))));
    }

    #[test]
    fn test_listen_addr_defaults_per_role() {
        let config = Config::default();
        assert_eq!(config.listen_addr_for(ServiceRole::Origin), "0.0.0.0:7777");
        assert_eq!(config.listen_addr_for(ServiceRole::Cache), "0.0.0.0:8080");

        let config = Config {
            listen_addr: Some("127.0.0.1:9000".into()),
            ..Config::default()
        };
        assert_eq!(config.listen_addr_for(ServiceRole::Cache), "127.0.0.1:9000");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Origin".parse::<ServiceRole>().unwrap(), ServiceRole::Origin);
        assert_eq!("router".parse::<ServiceRole>().unwrap(), ServiceRole::Router);
        assert!("proxy".parse::<ServiceRole>().is_err());
    }
}
