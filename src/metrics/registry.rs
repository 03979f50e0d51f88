//! Scrape Registry
//!
//! A fresh `prometheus::Registry` per scrape. Nothing registered here
//! outlives the response it was built for.

use std::collections::HashSet;

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::{Error, Result};
use crate::metrics::definition::MetricDefinition;
use crate::metrics::mapper::Sample;

/// Connectivity gauge name (1 = OK, 0 = error).
pub const CONNECTION_STATUS: &str = "neo4j_exporter_connection_status";

/// Per-scrape error count gauge name.
pub const METRIC_ERRORS: &str = "neo4j_exporter_metric_errors";

const CONNECTION_STATUS_HELP: &str = "Connection status to Neo4j (1 = OK, 0 = Error)";
const METRIC_ERRORS_HELP: &str = "Number of metric processing errors in this scrape";

/// Collector built for one definition, not yet registered.
#[derive(Debug, Clone)]
pub enum PreparedMetric {
    Single(Gauge),
    Vector(GaugeVec),
}

/// Per-request metric registry.
#[derive(Clone)]
pub struct ScrapeRegistry {
    registry: Registry,
    names: HashSet<String>,
}

impl Default for ScrapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            names: [CONNECTION_STATUS, METRIC_ERRORS]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Build the collector for a definition.
    ///
    /// Fails on invalid metric or label names and on a name already claimed
    /// in this scrape.
    pub fn prepare(&mut self, definition: &MetricDefinition) -> Result<PreparedMetric> {
        if self.names.contains(&definition.name) {
            return Err(Error::Prometheus(prometheus::Error::AlreadyReg));
        }

        // Empty help text is rejected by the encoder descriptor.
        let help = if definition.help.is_empty() {
            definition.name.clone()
        } else {
            definition.help.clone()
        };
        let opts = Opts::new(definition.name.clone(), help);
        let prepared = if definition.is_labeled() {
            let labels: Vec<&str> = definition.labels.iter().map(String::as_str).collect();
            PreparedMetric::Vector(GaugeVec::new(opts, &labels)?)
        } else {
            PreparedMetric::Single(Gauge::with_opts(opts)?)
        };

        self.names.insert(definition.name.clone());
        Ok(prepared)
    }

    /// Write samples into a prepared collector and register it.
    ///
    /// With no samples nothing is registered and the metric stays absent
    /// from the output.
    pub fn publish(&self, metric: PreparedMetric, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        match metric {
            PreparedMetric::Single(gauge) => {
                if let Some(sample) = samples.first() {
                    gauge.set(sample.value);
                }
                self.registry.register(Box::new(gauge))?;
            }
            PreparedMetric::Vector(vec) => {
                for sample in samples {
                    let values: Vec<&str> =
                        sample.label_values.iter().map(String::as_str).collect();
                    vec.get_metric_with_label_values(&values)?.set(sample.value);
                }
                self.registry.register(Box::new(vec))?;
            }
        }
        Ok(())
    }

    /// Register a plain gauge with a fixed value.
    fn set_builtin(&self, name: &str, help: &str, value: f64) -> Result<()> {
        let gauge = Gauge::with_opts(Opts::new(name, help))?;
        gauge.set(value);
        self.registry.register(Box::new(gauge))?;
        Ok(())
    }

    pub fn set_connection_status(&self, connected: bool) -> Result<()> {
        self.set_builtin(
            CONNECTION_STATUS,
            CONNECTION_STATUS_HELP,
            if connected { 1.0 } else { 0.0 },
        )
    }

    pub fn set_metric_errors(&self, errors: u64) -> Result<()> {
        self.set_builtin(METRIC_ERRORS, METRIC_ERRORS_HELP, errors as f64)
    }

    /// Content type of the encoded output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Encode everything registered in the text exposition format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }

    /// Number of metric families currently registered.
    pub fn family_count(&self) -> usize {
        self.registry.gather().len()
    }
}

impl std::fmt::Debug for ScrapeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeRegistry")
            .field("names", &self.names.len())
            .finish()
    }
}
