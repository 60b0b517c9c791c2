// src/health.rs

//! HTTP health probe for deployments.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Timeout used when a deployment doesn't configure one.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Carries the reason, e.g. `HTTP 503` or a transport error message.
    Unhealthy(String),
    /// The deployment was stopped on request.
    Stopped,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Map an HTTP status code: any 2xx is healthy.
    pub fn from_status_code(code: u16) -> Self {
        if (200..300).contains(&code) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy(format!("HTTP {code}"))
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Unhealthy(reason) => write!(f, "UNHEALTHY: {reason}"),
            HealthStatus::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub url: String,
    pub status: HealthStatus,
    /// Recorded whether or not the probe succeeded.
    pub response_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct HealthChecker {
    client: reqwest::Client,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cmdrunner/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Issue a single GET against `url`, bounded by `timeout` (or
    /// [`DEFAULT_HEALTH_TIMEOUT`]).
    pub async fn check(&self, url: &str, timeout: Option<Duration>) -> HealthCheck {
        let timeout = timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_HEALTH_TIMEOUT);
        let started = Instant::now();

        let status = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => HealthStatus::from_status_code(response.status().as_u16()),
            Err(err) => {
                debug!(url, error = %err, "health check request failed");
                HealthStatus::Unhealthy(err.to_string())
            }
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        info!(url, %status, response_time_ms, "health check finished");
        HealthCheck {
            url: url.to_string(),
            status,
            response_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_health() {
        assert_eq!(HealthStatus::from_status_code(200), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_status_code(204), HealthStatus::Healthy);
        assert_eq!(
            HealthStatus::from_status_code(301).to_string(),
            "UNHEALTHY: HTTP 301"
        );
        assert_eq!(
            HealthStatus::from_status_code(500).to_string(),
            "UNHEALTHY: HTTP 500"
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(HealthStatus::Healthy.to_string(), "HEALTHY");
        assert_eq!(HealthStatus::Stopped.to_string(), "STOPPED");
    }

    #[tokio::test]
    async fn refused_connection_is_unhealthy() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let check = HealthChecker::new()
            .check(&format!("http://{addr}/health"), Some(Duration::from_secs(2)))
            .await;
        assert!(!check.status.is_healthy());
        assert!(check.status.to_string().starts_with("UNHEALTHY: "));
    }
}
