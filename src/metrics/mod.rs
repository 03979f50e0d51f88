//! Metrics module
//!
//! Dynamic metric collection: definitions, row mapping, the per-scrape
//! registry and the engine tying them together.

pub mod definition;
pub mod engine;
pub mod mapper;
pub mod registry;

pub use definition::{DefinitionError, DefinitionStore, LoadWarning, MetricDefinition, SourceFormat};
pub use engine::{check_connectivity, CollectionEngine, ScrapeOutcome};
pub use mapper::{map_row, map_rows, MappingError, Sample};
pub use registry::{ScrapeRegistry, CONNECTION_STATUS, METRIC_ERRORS};

#[cfg(test)]
mod proptest;
