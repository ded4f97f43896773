//! Post-deploy health probing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RunnerResult;

/// Outcome of a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    /// 2xx response
    Healthy { code: u16 },
    /// Non-2xx response
    Unhealthy { code: u16 },
    /// Connection, DNS or timeout failure
    Unreachable { reason: String },
    /// No health URL configured
    Skipped,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    /// One-line summary for logs and the audit trail.
    pub fn summary(&self) -> String {
        match self {
            Self::Healthy { code } => format!("healthy (HTTP {})", code),
            Self::Unhealthy { code } => format!("unhealthy (HTTP {})", code),
            Self::Unreachable { reason } => format!("unreachable ({})", reason),
            Self::Skipped => "skipped (no health URL)".to_string(),
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// A post-deploy health check. The result is reported, never acted upon.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> HealthStatus;
}

/// Single HTTP GET issued after a fixed settle delay.
pub struct HttpHealthProbe {
    url: String,
    delay: Duration,
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(url: impl Into<String>, delay: Duration, timeout: Duration) -> RunnerResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            delay,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> HealthStatus {
        if !self.delay.is_zero() {
            debug!("Waiting {:?} before probing {}", self.delay, self.url);
            tokio::time::sleep(self.delay).await;
        }

        let status = match self.client.get(&self.url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                if response.status().is_success() {
                    HealthStatus::Healthy { code }
                } else {
                    HealthStatus::Unhealthy { code }
                }
            }
            Err(e) => HealthStatus::Unreachable { reason: e.to_string() },
        };

        if status.is_healthy() {
            info!("Health check {}: {}", self.url, status);
        } else {
            warn!("Health check {}: {}", self.url, status);
        }
        status
    }
}

/// Probe returning a fixed status, counting invocations.
#[derive(Debug, Clone)]
pub struct StaticHealthProbe {
    status: HealthStatus,
    calls: Arc<AtomicUsize>,
}

impl StaticHealthProbe {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy { code: 200 })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for StaticHealthProbe {
    async fn probe(&self) -> HealthStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_summary() {
        assert!(HealthStatus::Healthy { code: 204 }.is_healthy());
        assert!(!HealthStatus::Unhealthy { code: 503 }.is_healthy());
        assert_eq!(HealthStatus::Unhealthy { code: 503 }.summary(), "unhealthy (HTTP 503)");
        assert!(!HealthStatus::Skipped.is_healthy());
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let probe = HttpHealthProbe::new(
            "http://127.0.0.1:9/health",
            Duration::ZERO,
            Duration::from_secs(2),
        )
        .unwrap();
        let status = probe.probe().await;
        assert!(matches!(status, HealthStatus::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_static_probe_counts_calls() {
        let probe = StaticHealthProbe::healthy();
        probe.probe().await;
        probe.probe().await;
        assert_eq!(probe.call_count(), 2);
    }
}
