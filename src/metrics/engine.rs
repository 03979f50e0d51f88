//! Collection Engine
//!
//! Runs one collection pass per scrape: gate on connectivity, then walk the
//! definitions in declaration order, querying and mapping each one. Every
//! failure below the connectivity check is counted and skipped.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use crate::domain::ports::GraphSource;
use crate::error::Result;
use crate::metrics::definition::{display_name, DefinitionStore, MetricDefinition};
use crate::metrics::mapper::{map_rows, Sample};
use crate::metrics::registry::{ScrapeRegistry, CONNECTION_STATUS, METRIC_ERRORS};

// =============================================================================
// Scrape Outcome
// =============================================================================

/// Result of one collection pass.
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// Whether the connectivity gate passed
    pub connected: bool,

    /// Errors counted during the pass; `None` when the gate failed
    pub error_count: Option<u64>,

    /// Samples produced, built-in gauges last
    pub samples: Vec<Sample>,

    registry: ScrapeRegistry,
}

impl ScrapeOutcome {
    /// A failed connectivity check makes the whole scrape a server error.
    pub fn is_fatal(&self) -> bool {
        !self.connected
    }

    /// HTTP status the scrape should be answered with.
    pub fn status_code(&self) -> u16 {
        if self.is_fatal() {
            500
        } else {
            200
        }
    }

    /// Look up a sample by metric name and label values.
    pub fn sample(&self, name: &str, label_values: &[&str]) -> Option<&Sample> {
        self.samples.iter().find(|s| {
            s.name == name
                && s.label_values.len() == label_values.len()
                && s.label_values.iter().zip(label_values).all(|(a, b)| a == b)
        })
    }

    pub fn content_type(&self) -> String {
        self.registry.content_type()
    }

    /// Encode the scrape registry in the exposition format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.registry.encode()
    }
}

// =============================================================================
// Connectivity Gate
// =============================================================================

/// Live round-trip against the source.
pub async fn check_connectivity<S>(source: &S) -> bool
where
    S: GraphSource + ?Sized,
{
    match source.verify().await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Connectivity check failed");
            false
        }
    }
}

fn builtin(name: &str, value: f64) -> Sample {
    Sample {
        name: name.to_string(),
        label_values: Vec::new(),
        value,
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Drives collection passes over a shared, read-only definition store.
#[derive(Debug, Clone)]
pub struct CollectionEngine {
    store: Arc<DefinitionStore>,
}

impl CollectionEngine {
    pub fn new(store: Arc<DefinitionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// Run one collection pass against `source`.
    ///
    /// Only a failed connectivity check stops the pass early. The returned
    /// error covers registry failures on the built-in gauges, which cannot
    /// happen on a fresh registry in practice.
    #[instrument(skip_all, fields(definitions = self.store.len()))]
    pub async fn collect<S>(&self, source: &S) -> Result<ScrapeOutcome>
    where
        S: GraphSource + ?Sized,
    {
        let started = Instant::now();
        let mut registry = ScrapeRegistry::new();

        if !check_connectivity(source).await {
            registry.set_connection_status(false)?;
            return Ok(ScrapeOutcome {
                connected: false,
                error_count: None,
                samples: vec![builtin(CONNECTION_STATUS, 0.0)],
                registry,
            });
        }

        let mut samples = Vec::new();
        let mut errors: u64 = 0;

        for (index, raw) in self.store.iter().enumerate() {
            let definition = match MetricDefinition::from_raw(raw) {
                Ok(definition) => definition,
                Err(e) => {
                    debug!(
                        metric = %display_name(index, raw),
                        error = %e,
                        "Metric skipped: bad definition"
                    );
                    errors += 1;
                    continue;
                }
            };
            let name = definition.name.as_str();

            let prepared = match registry.prepare(&definition) {
                Ok(prepared) => prepared,
                Err(e) => {
                    debug!(metric = %name, error = %e, "Metric skipped: cannot declare gauge");
                    errors += 1;
                    continue;
                }
            };

            debug!(
                metric = %name,
                params = definition.query_params.len(),
                "Running metric query"
            );
            let rows = match source.run(&definition.query, &definition.query_params).await {
                Ok(rows) => rows,
                Err(e) => {
                    debug!(metric = %name, error = %e, "Query failed");
                    errors += 1;
                    continue;
                }
            };

            if rows.is_empty() {
                debug!(metric = %name, "Query returned zero rows");
                continue;
            }

            let mapped = map_rows(&definition, &rows);
            for (row, e) in &mapped.errors {
                debug!(metric = %name, row, error = %e, "Row skipped: conversion error");
            }
            errors += mapped.errors.len() as u64;

            if let Err(e) = registry.publish(prepared, &mapped.samples) {
                debug!(metric = %name, error = %e, "Metric skipped: cannot publish samples");
                errors += 1;
                continue;
            }
            samples.extend(mapped.samples);
        }

        registry.set_connection_status(true)?;
        registry.set_metric_errors(errors)?;
        samples.push(builtin(CONNECTION_STATUS, 1.0));
        samples.push(builtin(METRIC_ERRORS, errors as f64));

        debug!(
            errors,
            samples = samples.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape finished"
        );

        Ok(ScrapeOutcome {
            connected: true,
            error_count: Some(errors),
            samples,
            registry,
        })
    }

    /// Connectivity gate on its own, for health probes.
    pub async fn healthy<S>(&self, source: &S) -> bool
    where
        S: GraphSource + ?Sized,
    {
        check_connectivity(source).await
    }
}
