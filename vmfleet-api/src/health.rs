//! Health and liveness reporting

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::registry::RegistryStats;

/// Overall service health status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Shutdown has begun; in-flight requests are still served
    Draining,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: i64,
    pub hosts: usize,
    pub vms: usize,
}

/// Liveness response for `/ping`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingResponse {
    pub message: String,
}

impl PingResponse {
    pub fn pong() -> Self {
        Self {
            message: "pong".to_string(),
        }
    }
}

/// Tracks process uptime for health responses
pub struct HealthChecker {
    start_time: Instant,
    version: String,
}

impl HealthChecker {
    pub fn new(version: &str) -> Self {
        Self {
            start_time: Instant::now(),
            version: version.to_string(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn report(&self, stats: RegistryStats, shutting_down: bool) -> HealthResponse {
        let status = if shutting_down {
            HealthStatus::Draining
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            version: self.version.clone(),
            uptime_seconds: self.uptime_seconds(),
            timestamp: chrono::Utc::now().timestamp(),
            hosts: stats.hosts,
            vms: stats.vms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_carries_stats() {
        let checker = HealthChecker::new("1.2.3");
        let report = checker.report(RegistryStats { hosts: 2, vms: 5 }, false);

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.version, "1.2.3");
        assert_eq!(report.hosts, 2);
        assert_eq!(report.vms, 5);
        assert!(report.timestamp > 0);
    }

    #[test]
    fn test_report_draining_during_shutdown() {
        let checker = HealthChecker::new("1.2.3");
        let report = checker.report(RegistryStats { hosts: 0, vms: 0 }, true);

        assert_eq!(report.status, HealthStatus::Draining);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "draining");
    }

    #[test]
    fn test_ping_serialization() {
        let json = serde_json::to_string(&PingResponse::pong()).unwrap();
        assert_eq!(json, r#"{"message":"pong"}"#);
    }
}
