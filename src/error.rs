//! Error types for the Neo4j exporter

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Neo4j exporter
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neo4j connection error
    #[error("Neo4j connection error: {0}")]
    Neo4jConnection(#[source] reqwest::Error),

    /// Neo4j rejected the request (authentication, unavailable database, ...)
    #[error("Neo4j request failed with status {status}: {body}")]
    Neo4jStatus { status: u16, body: String },

    /// Cypher query error reported by Neo4j
    #[error("Cypher query failed [{code}]: {message}")]
    Query { code: String, message: String },

    /// Neo4j response parse error
    #[error("Failed to parse Neo4j response: {0}")]
    ResponseParse(String),

    /// Prometheus registry or encoder error
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error happened before Neo4j could answer at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Neo4jConnection(_))
    }
}
