//! Ports and Adapters Infrastructure
//!
//! Marker and health-check traits shared by every port in the system.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        Bill Transaction Engine           │
//! └──────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │   Port traits (BillStore, BillReader,    │
//! │   StockReader) in domain_billing         │
//! └──────────────────────────────────────────┘
//!            ▲                    ▲
//!   ┌────────┴────────┐  ┌────────┴────────┐
//!   │ PostgreSQL      │  │ In-memory mock  │
//!   │ adapter         │  │ (tests)         │
//!   └─────────────────┘  └─────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker trait for all domain ports
///
/// All port traits should extend this marker to ensure they are
/// thread-safe and can be used in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    /// Adapter is healthy and operational
    Healthy,
    /// Adapter is degraded but operational
    Degraded,
    /// Adapter is unhealthy and not operational
    Unhealthy,
    /// Health status is unknown
    Unknown,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Adapter identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// Builds a healthy result
    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        }
    }

    /// Builds an unhealthy result carrying the failure message
    pub fn unhealthy(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(message.into()),
            checked_at: Utc::now(),
        }
    }

    /// Returns true when the adapter can serve requests
    pub fn is_operational(&self) -> bool {
        matches!(self.status, AdapterHealth::Healthy | AdapterHealth::Degraded)
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the adapter
    ///
    /// # Returns
    ///
    /// A `HealthCheckResult` indicating the current health status
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_result_is_operational() {
        let result = HealthCheckResult::healthy("postgres-bill-store", 3);
        assert!(result.is_operational());
        assert!(result.message.is_none());
    }

    #[test]
    fn test_unhealthy_result_carries_message() {
        let result = HealthCheckResult::unhealthy("postgres-bill-store", 30_000, "pool timed out");
        assert!(!result.is_operational());
        assert_eq!(result.message.as_deref(), Some("pool timed out"));
    }

    #[test]
    fn test_adapter_health_serializes_snake_case() {
        let json = serde_json::to_string(&AdapterHealth::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }
}
