//! Server Registry
//!
//! Parses the shared servers file into the immutable origin and cache address lists.
//!
//! ```text
//! origin_servers
//! 127.0.0.1:7777
//!
//! cache_servers
//! 127.0.0.1:8080
//! 127.0.0.1:8081
//! ```

use std::fs;
use std::path::Path;

use crate::error::{CdnError, Result};

/// Header of the origin address section.
pub const ORIGIN_SECTION: &str = "origin_servers";
/// Header of the cache address section.
pub const CACHE_SECTION: &str = "cache_servers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Origin,
    Cache,
    Unknown,
}

// == Server Registry ==
/// Origin and cache addresses loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRegistry {
    origins: Vec<String>,
    caches: Vec<String>,
}

impl ServerRegistry {
    /// Reads and parses the servers file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CdnError::Config(format!("cannot read servers file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Parses servers file text.
    ///
    /// A section runs from its header to the next blank line or header. Lines starting
    /// with `#` are ignored anywhere.
    pub fn parse(text: &str) -> Result<Self> {
        let mut registry = Self::default();
        let mut current: Option<Section> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                current = None;
                continue;
            }
            if line.ends_with("_servers") {
                current = Some(match line {
                    ORIGIN_SECTION => Section::Origin,
                    CACHE_SECTION => Section::Cache,
                    _ => Section::Unknown,
                });
                continue;
            }

            let section = current.ok_or_else(|| {
                CdnError::Config(format!(
                    "line {}: '{}' is outside of any section",
                    index + 1,
                    line
                ))
            })?;
            validate_address(line).map_err(|reason| {
                CdnError::Config(format!("line {}: '{}' {}", index + 1, line, reason))
            })?;

            match section {
                Section::Origin => registry.origins.push(line.to_string()),
                Section::Cache => registry.caches.push(line.to_string()),
                Section::Unknown => {}
            }
        }

        Ok(registry)
    }

    /// Origin addresses, failing when none are configured.
    pub fn origins(&self) -> Result<&[String]> {
        non_empty(&self.origins, ORIGIN_SECTION)
    }

    /// Cache node addresses, failing when none are configured.
    pub fn caches(&self) -> Result<&[String]> {
        non_empty(&self.caches, CACHE_SECTION)
    }
}

fn non_empty<'a>(list: &'a [String], section: &str) -> Result<&'a [String]> {
    if list.is_empty() {
        return Err(CdnError::Config(format!(
            "no addresses found in the {} section",
            section
        )));
    }
    Ok(list)
}

fn validate_address(line: &str) -> std::result::Result<(), &'static str> {
    let (host, port) = line.rsplit_once(':').ok_or("is not host:port")?;
    if host.is_empty() {
        return Err("has an empty host");
    }
    port.parse::<u16>().map_err(|_| "has an invalid port")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "origin_servers\n127.0.0.1:7777\n10.0.0.2:7777\n\ncache_servers\n127.0.0.1:8080\nlocalhost:8081\n";

    #[test]
    fn test_parse_both_sections() {
        let registry = ServerRegistry::parse(SAMPLE).unwrap();
        assert_eq!(
            registry.origins().unwrap(),
            &["127.0.0.1:7777".to_string(), "10.0.0.2:7777".to_string()]
        );
        assert_eq!(
            registry.caches().unwrap(),
            &["127.0.0.1:8080".to_string(), "localhost:8081".to_string()]
        );
    }

    #[test]
    fn test_header_terminates_section_without_blank_line() {
        let text = "origin_servers\n127.0.0.1:7777\ncache_servers\n127.0.0.1:8080\n";
        let registry = ServerRegistry::parse(text).unwrap();
        assert_eq!(registry.origins().unwrap().len(), 1);
        assert_eq!(registry.caches().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let registry = ServerRegistry::parse("cache_servers\n127.0.0.1:8080\n").unwrap();
        assert!(matches!(registry.origins(), Err(CdnError::Config(_))));
        assert!(registry.caches().is_ok());
    }

    #[test]
    fn test_comments_and_whitespace_are_ignored() {
        let text = "# shared topology\norigin_servers\n  127.0.0.1:7777  \n# spare\n";
        let registry = ServerRegistry::parse(text).unwrap();
        assert_eq!(registry.origins().unwrap(), &["127.0.0.1:7777".to_string()]);
    }

    #[test]
    fn test_unknown_section_is_skipped() {
        let text = "log_servers\n127.0.0.1:24224\n\norigin_servers\n127.0.0.1:7777\n";
        let registry = ServerRegistry::parse(text).unwrap();
        assert_eq!(registry.origins().unwrap().len(), 1);
        assert!(registry.caches().is_err());
    }

    #[test]
    fn test_stray_line_is_rejected() {
        let text = "origin_servers\n127.0.0.1:7777\n\n127.0.0.1:7778\n";
        assert!(matches!(
            ServerRegistry::parse(text),
            Err(CdnError::Config(_))
        ));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        assert!(ServerRegistry::parse("origin_servers\n127.0.0.1\n").is_err());
        assert!(ServerRegistry::parse("origin_servers\n127.0.0.1:http\n").is_err());
        assert!(ServerRegistry::parse("origin_servers\n:7777\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServerRegistry::load("/nonexistent/servers.txt");
        assert!(matches!(result, Err(CdnError::Config(_))));
    }
}
