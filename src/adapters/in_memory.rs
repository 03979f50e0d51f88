//! In-memory graph source.
//!
//! Serves scripted rows for known statements. Used by tests and for running
//! the engine without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::ports::{GraphSource, QueryParams, ResultRow};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Scripted {
    Rows(Vec<ResultRow>),
    Failure { code: String, message: String },
}

/// A statement the source was asked to run, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub query: String,
    pub params: QueryParams,
}

/// Graph source answering from a fixed script.
///
/// Statements that were never scripted fail with a syntax error, the way a
/// real server rejects a malformed query.
#[derive(Debug)]
pub struct InMemoryGraphSource {
    scripts: RwLock<HashMap<String, Scripted>>,
    executed: RwLock<Vec<ExecutedQuery>>,
    reachable: AtomicBool,
}

impl Default for InMemoryGraphSource {
    fn default() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            executed: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }
}

impl InMemoryGraphSource {
    /// Create a reachable source with no scripted statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the rows a statement returns.
    pub fn with_rows(self, query: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        self.scripts.write().insert(query.into(), Scripted::Rows(rows));
        self
    }

    /// Script a statement that fails with a Cypher error.
    pub fn with_failure(self, query: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts.write().insert(
            query.into(),
            Scripted::Failure {
                code: "Neo.DatabaseError.Statement.ExecutionFailed".to_string(),
                message: message.into(),
            },
        );
        self
    }

    /// Toggle whether `verify` succeeds.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }

    /// Create an unreachable source.
    pub fn unreachable() -> Self {
        let source = Self::default();
        source.set_reachable(false);
        source
    }

    /// Every statement run so far, in order.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.executed.read().clone()
    }

    /// Forget the recorded statements.
    pub fn clear_executed(&self) {
        self.executed.write().clear();
    }
}

#[async_trait]
impl GraphSource for InMemoryGraphSource {
    async fn verify(&self) -> Result<()> {
        if self.reachable.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::Internal("in-memory source marked unreachable".to_string()))
        }
    }

    async fn run(&self, query: &str, params: &QueryParams) -> Result<Vec<ResultRow>> {
        self.executed.write().push(ExecutedQuery {
            query: query.to_string(),
            params: params.clone(),
        });

        match self.scripts.read().get(query) {
            Some(Scripted::Rows(rows)) => Ok(rows.clone()),
            Some(Scripted::Failure { code, message }) => Err(Error::Query {
                code: code.clone(),
                message: message.clone(),
            }),
            None => Err(Error::Query {
                code: "Neo.ClientError.Statement.SyntaxError".to_string(),
                message: format!("Invalid input: {}", query),
            }),
        }
    }
}
