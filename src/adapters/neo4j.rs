//! Neo4j Graph Source Adapter
//!
//! Implements the `GraphSource` port against the Neo4j HTTP transactional
//! Cypher endpoint (`POST /db/{database}/tx/commit`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::ports::{GraphSource, QueryParams, ResultRow};
use crate::error::{Error, Result};

/// Statement used for the live connectivity round-trip.
const VERIFY_STATEMENT: &str = "RETURN 1 AS ok";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the Neo4j adapter
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Server URI (`http(s)://`, `bolt://` or `neo4j://`)
    pub uri: String,

    /// Username for basic auth
    pub user: String,

    /// Password for basic auth
    pub password: String,

    /// Database the queries run against
    pub database: String,

    /// Per-request timeout
    pub query_timeout: Duration,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// Turn a configured URI into the base URL of the HTTP API.
///
/// Bolt and routing schemes are mapped onto the default HTTP(S) port of the
/// same host.
pub fn http_base_url(uri: &str) -> String {
    let uri = uri.trim().trim_end_matches('/');
    let Some((scheme, rest)) = uri.split_once("://") else {
        return format!("http://{}", uri);
    };

    let (http_scheme, port) = match scheme {
        "http" | "https" => return uri.to_string(),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => ("https", 7473),
        _ => ("http", 7474),
    };

    let authority = rest.split('/').next().unwrap_or(rest);
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        _ => authority,
    };

    format!("{}://{}:{}", http_scheme, host, port)
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: [Statement<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: &'a QueryParams,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    #[serde(default)]
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Convert a decoded transaction response into rows, surfacing Cypher errors.
fn into_rows(response: TxResponse) -> Result<Vec<ResultRow>> {
    if let Some(err) = response.errors.into_iter().next() {
        return Err(Error::Query {
            code: err.code,
            message: err.message,
        });
    }

    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(result
        .data
        .into_iter()
        .map(|data| ResultRow::from_columns(&result.columns, data.row))
        .collect())
}

// =============================================================================
// Adapter
// =============================================================================

/// Graph source backed by a Neo4j server's HTTP API.
///
/// The underlying `reqwest::Client` pools connections and is shared by every
/// scrape.
pub struct Neo4jHttpSource {
    config: Neo4jConfig,
    client: Client,
    commit_url: String,
}

impl Neo4jHttpSource {
    /// Create a new adapter. No network traffic happens here.
    pub fn new(config: Neo4jConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.query_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let commit_url = format!(
            "{}/db/{}/tx/commit",
            http_base_url(&config.uri),
            config.database
        );

        Ok(Self {
            config,
            client,
            commit_url,
        })
    }

    /// Endpoint every statement is posted to.
    pub fn commit_url(&self) -> &str {
        &self.commit_url
    }

    pub fn config(&self) -> &Neo4jConfig {
        &self.config
    }

    async fn execute(&self, query: &str, params: &QueryParams) -> Result<Vec<ResultRow>> {
        let body = TxRequest {
            statements: [Statement {
                statement: query,
                parameters: params,
            }],
        };

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await
            .map_err(Error::Neo4jConnection)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Neo4jStatus {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: TxResponse = response
            .json()
            .await
            .map_err(|e| Error::ResponseParse(e.to_string()))?;

        into_rows(decoded)
    }
}

impl std::fmt::Debug for Neo4jHttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jHttpSource")
            .field("commit_url", &self.commit_url)
            .field("user", &self.config.user)
            .finish()
    }
}

#[async_trait]
impl GraphSource for Neo4jHttpSource {
    #[instrument(skip(self))]
    async fn verify(&self) -> Result<()> {
        self.execute(VERIFY_STATEMENT, &QueryParams::new())
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, params), fields(param_count = params.len()))]
    async fn run(&self, query: &str, params: &QueryParams) -> Result<Vec<ResultRow>> {
        let rows = self.execute(query, params).await?;
        debug!(rows = rows.len(), "Cypher query returned");
        Ok(rows)
    }
}
