//! Document store health checks

use crate::search::error::{SearchError, SearchResult};
use crate::search::store::{ClusterHealth, HealthStatus, IndexAdmin};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterHealth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            cluster: None,
            error: Some(error.into()),
        }
    }
}

/// Probes the store with a ping followed by a cluster health request
#[derive(Clone)]
pub struct HealthChecker {
    admin: Arc<dyn IndexAdmin>,
    poll_interval: Duration,
}

impl HealthChecker {
    pub fn new(admin: Arc<dyn IndexAdmin>) -> Self {
        Self {
            admin,
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Probe the store. Never fails; failures are reported as unhealthy.
    pub async fn check(&self) -> HealthReport {
        match self.admin.ping().await {
            Ok(true) => {}
            Ok(false) => return HealthReport::unhealthy("ping failed"),
            Err(e) => return HealthReport::unhealthy(e.to_string()),
        }

        match self.admin.cluster_health().await {
            Ok(cluster) => HealthReport {
                status: cluster.status.into(),
                cluster: Some(cluster),
                error: None,
            },
            Err(e) => HealthReport {
                status: HealthStatus::Unknown,
                cluster: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Healthy or degraded; a yellow cluster still serves searches
    pub async fn is_healthy(&self) -> bool {
        matches!(
            self.check().await.status,
            HealthStatus::Healthy | HealthStatus::Degraded
        )
    }

    /// Poll until the store is healthy or `timeout` elapses
    pub async fn wait_for_healthy(&self, timeout: Duration) -> SearchResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let report = self.check().await;
            if matches!(report.status, HealthStatus::Healthy | HealthStatus::Degraded) {
                info!(status = %report.status, "Document store is ready");
                return Ok(());
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(SearchError::Unhealthy(format!(
                    "not healthy after {:?}: {}",
                    timeout,
                    report.error.unwrap_or_else(|| report.status.to_string())
                )));
            }

            warn!(status = %report.status, "Waiting for document store");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
