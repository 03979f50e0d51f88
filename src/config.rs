//! Exporter configuration
//!
//! Values are resolved CLI ▶ environment ▶ default. Most of that is done by
//! clap in `main.rs`; this module holds the resolved settings and the few
//! rules clap cannot express.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::adapters::Neo4jConfig;

/// Listen port used when none (or an invalid one) is configured.
pub const DEFAULT_PORT: u16 = 8000;

/// Environment variable consulted for the listen port.
pub const PORT_ENV: &str = "NEO4J_EXPORTER_PORT";

/// Resolved exporter settings
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Neo4j connection settings
    pub neo4j: Neo4jConfig,

    /// Port the HTTP server listens on (all interfaces)
    pub port: u16,

    /// Metric definition document
    pub metrics_file: PathBuf,

    /// Debug logging
    pub debug: bool,

    /// JSON log output
    pub log_json: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            neo4j: Neo4jConfig::default(),
            port: DEFAULT_PORT,
            metrics_file: PathBuf::from("metrics.json"),
            debug: false,
            log_json: false,
        }
    }
}

impl ExporterConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Pick the listen port.
///
/// A CLI value always wins. An unparsable environment value falls back to
/// the default and returns a warning for the caller to log.
pub fn resolve_port(cli: Option<u16>, env: Option<&str>) -> (u16, Option<String>) {
    if let Some(port) = cli {
        return (port, None);
    }

    match env {
        None => (DEFAULT_PORT, None),
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(port) => (port, None),
            Err(_) => (
                DEFAULT_PORT,
                Some(format!(
                    "Invalid {}='{}'. Defaulting to {}.",
                    PORT_ENV, raw, DEFAULT_PORT
                )),
            ),
        },
    }
}
