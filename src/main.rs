//! Neo4j Prometheus Exporter
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     neo4j-exporter                          │
//! ├────────────────────────────────────────────────────────────┤
//! │  metrics.json ──▶ DefinitionStore                           │
//! │                        │                                    │
//! │  GET /metrics ──▶ CollectionEngine ──▶ Neo4j (HTTP API)     │
//! │                        │                                    │
//! │                        ▼                                    │
//! │                 ScrapeRegistry ──▶ text exposition          │
//! └────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neo4j_exporter::adapters::{Neo4jConfig, Neo4jHttpSource};
use neo4j_exporter::config::{self, ExporterConfig};
use neo4j_exporter::domain::GraphSource;
use neo4j_exporter::error::Result;
use neo4j_exporter::metrics::{CollectionEngine, DefinitionStore};
use neo4j_exporter::server::{self, AppState};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Prometheus exporter that scrapes metrics from Neo4j.
///
/// CLI flags always override environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Neo4j URI (http(s)://, bolt:// or neo4j://)
    #[arg(long, env = "NEO4J_URI", default_value = "http://localhost:7474")]
    neo4j_uri: String,

    /// Neo4j username
    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    neo4j_user: String,

    /// Neo4j password
    #[arg(long, env = "NEO4J_PASSWORD", default_value = "password", hide_env_values = true)]
    neo4j_password: String,

    /// Neo4j database the metric queries run against
    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    neo4j_database: String,

    /// Exporter listen port [env: NEO4J_EXPORTER_PORT] [default: 8000]
    #[arg(long)]
    port: Option<u16>,

    /// Metric definition document (JSON, or YAML by extension)
    #[arg(long, env = "NEO4J_EXPORTER_METRICS_FILE", default_value = "metrics.json")]
    metrics_file: PathBuf,

    /// Timeout for each Neo4j request in seconds
    #[arg(long, env = "NEO4J_EXPORTER_QUERY_TIMEOUT", default_value = "30")]
    query_timeout_seconds: u64,

    /// Enable debug logs
    #[arg(long, env = "NEO4J_EXPORTER_DEBUG", value_parser = BoolishValueParser::new())]
    debug: bool,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", value_parser = BoolishValueParser::new())]
    log_json: bool,
}

impl Args {
    fn into_config(self) -> (ExporterConfig, Option<String>) {
        let env_port = std::env::var(config::PORT_ENV).ok();
        let (port, port_warning) = config::resolve_port(self.port, env_port.as_deref());

        let config = ExporterConfig {
            neo4j: Neo4jConfig {
                uri: self.neo4j_uri,
                user: self.neo4j_user,
                password: self.neo4j_password,
                database: self.neo4j_database,
                query_timeout: Duration::from_secs(self.query_timeout_seconds),
            },
            port,
            metrics_file: self.metrics_file,
            debug: self.debug,
            log_json: self.log_json,
        };
        (config, port_warning)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let (config, port_warning) = Args::parse().into_config();

    init_logging(&config);

    if let Some(warning) = port_warning {
        warn!("{}", warning);
    }

    info!("Starting Neo4j exporter on {}", config.listen_addr());
    info!(
        "  NEO4J_URI='{}', USER='{}', DATABASE='{}'",
        config.neo4j.uri, config.neo4j.user, config.neo4j.database
    );

    let (store, load_warning) = DefinitionStore::load(&config.metrics_file);
    if let Some(warning) = load_warning {
        warn!(
            "{} - exporter will expose only built-in metrics.",
            warning
        );
    }

    let source = Neo4jHttpSource::new(config.neo4j.clone())?;
    match source.verify().await {
        Ok(()) => debug!(
            "Connected to Neo4j at {} as '{}'",
            config.neo4j.uri, config.neo4j.user
        ),
        Err(e) => error!("Failed to verify Neo4j connectivity: {}", e),
    }

    let state = AppState::new(
        CollectionEngine::new(Arc::new(store)),
        Arc::new(source),
    );

    server::run(config.listen_addr(), state).await?;

    info!("Exporter shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(config: &ExporterConfig) {
    let level = if config.debug { Level::DEBUG } else { Level::INFO };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
