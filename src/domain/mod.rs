//! Domain Layer
//!
//! The graph source port and the values that cross it.
//!
//! # Usage
//!
//! ```ignore
//! use neo4j_exporter::domain::{GraphSource, QueryParams};
//!
//! async fn count_nodes<S: GraphSource>(source: &S) -> Result<usize> {
//!     let rows = source
//!         .run("MATCH (n) RETURN count(n) AS c", &QueryParams::new())
//!         .await?;
//!     Ok(rows.len())
//! }
//! ```

pub mod ports;

pub use ports::{ConversionError, FieldValue, GraphSource, QueryParams, ResultRow};
