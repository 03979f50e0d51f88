//! Neo4j Prometheus Exporter
//!
//! Runs a declarative list of Cypher queries on every scrape and exposes the
//! results as Prometheus gauges. One broken metric definition, failed query
//! or unconvertible row never takes the rest of the scrape down with it.
//!
//! # Architecture
//!
//! ```text
//! GET /metrics → CollectionEngine ─┬─ Connectivity gate (GraphSource::verify)
//!                                  ├─ DefinitionStore (declaration order)
//!                                  ├─ GraphSource::run per definition
//!                                  ├─ Row mapper → samples
//!                                  └─ ScrapeRegistry (fresh per request) → text
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Graph source implementations (Neo4j HTTP, in-memory)
//! - [`config`] - Resolved exporter settings
//! - [`domain`] - Graph source port and row value types
//! - [`error`] - Error types
//! - [`metrics`] - Definitions, mapping, per-scrape registry, engine
//! - [`server`] - HTTP front end

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use adapters::{InMemoryGraphSource, Neo4jConfig, Neo4jHttpSource};
pub use config::ExporterConfig;
pub use domain::{FieldValue, GraphSource, QueryParams, ResultRow};
pub use error::{Error, Result};
pub use metrics::{CollectionEngine, DefinitionStore, ScrapeOutcome};
pub use server::AppState;
