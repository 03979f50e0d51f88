//! Health probe payload.

use serde::{Deserialize, Serialize};

/// Health status reported by `/healthz`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Neo4j answered the connectivity check
    Healthy,
    /// Neo4j could not be reached
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// JSON body of the health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: HealthStatus,
}
