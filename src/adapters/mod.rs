//! Infrastructure Adapters
//!
//! Implementations of the `GraphSource` port.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                 GraphSource (verify / run)                  │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │      Neo4jHttpSource       │      InMemoryGraphSource       │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use neo4j_exporter::adapters::{Neo4jConfig, Neo4jHttpSource};
//! use neo4j_exporter::domain::GraphSource;
//!
//! let source = Neo4jHttpSource::new(Neo4jConfig::default())?;
//! source.verify().await?;
//! ```

mod in_memory;
mod neo4j;

pub use in_memory::{ExecutedQuery, InMemoryGraphSource};
pub use neo4j::{http_base_url, Neo4jConfig, Neo4jHttpSource};
