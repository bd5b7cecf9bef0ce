//! Prometheus metrics collection for navigation resolution

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::outcome::NavigationOutcome;

/// Navigation metrics
#[derive(Debug, Clone, Default)]
pub struct NavigationMetrics {
    /// Total number of resolved navigations
    pub total_navigations: u64,

    pub committed: u64,
    pub denied: u64,
    pub not_found: u64,

    /// Redirect instructions returned to the caller
    pub redirected: u64,

    /// Navigations that exceeded the redirect cap
    pub redirect_loops: u64,

    /// Navigations superseded before committing
    pub cancelled: u64,

    /// Redirects followed internally
    pub redirects_followed: u64,

    /// Latency percentiles (p50, p90, p95, p99)
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,
}

impl NavigationMetrics {
    /// Share of navigations that committed
    pub fn commit_rate(&self) -> f64 {
        if self.total_navigations == 0 {
            0.0
        } else {
            self.committed as f64 / self.total_navigations as f64
        }
    }
}

/// Metrics collector with Prometheus-compatible storage
pub struct MetricsCollector {
    metrics: Arc<RwLock<NavigationMetrics>>,

    /// Latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(NavigationMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    /// Record a finished navigation
    pub async fn record_outcome(&self, outcome: &NavigationOutcome) {
        let mut metrics = self.metrics.write().await;
        metrics.total_navigations += 1;

        match outcome {
            NavigationOutcome::Committed(navigation) => {
                metrics.committed += 1;
                metrics.redirects_followed += navigation.redirects.len() as u64;
            }
            NavigationOutcome::Redirected { .. } => metrics.redirected += 1,
            NavigationOutcome::Denied { .. } => metrics.denied += 1,
            NavigationOutcome::NotFound { .. } => metrics.not_found += 1,
            NavigationOutcome::FatalRedirectLoop { .. } => metrics.redirect_loops += 1,
            NavigationOutcome::Cancelled { .. } => metrics.cancelled += 1,
        }
    }

    /// Record navigation latency
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }

        let mut metrics = self.metrics.write().await;

        let sum: f64 = samples.iter().sum();
        metrics.avg_latency_ms = sum / samples.len() as f64;

        let mut sorted = samples.clone();
        sorted.sort_by(f64::total_cmp);

        metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.latency_p90_ms = Self::percentile(&sorted, 0.90);
        metrics.latency_p95_ms = Self::percentile(&sorted, 0.95);
        metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
    }

    /// Get current metrics snapshot
    pub async fn get_metrics(&self) -> NavigationMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn reset(&self) {
        let mut metrics = self.metrics.write().await;
        *metrics = NavigationMetrics::default();

        let mut samples = self.latency_samples.write().await;
        samples.clear();
    }

    /// Export metrics in Prometheus format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.metrics.read().await;

        format!(
            r#"# HELP router_navigations_total Total number of resolved navigations
# TYPE router_navigations_total counter
router_navigations_total {}

# HELP router_navigation_outcomes_total Navigations by outcome
# TYPE router_navigation_outcomes_total counter
router_navigation_outcomes_total{{outcome="committed"}} {}
router_navigation_outcomes_total{{outcome="denied"}} {}
router_navigation_outcomes_total{{outcome="not_found"}} {}
router_navigation_outcomes_total{{outcome="redirected"}} {}
router_navigation_outcomes_total{{outcome="fatal_redirect_loop"}} {}
router_navigation_outcomes_total{{outcome="cancelled"}} {}

# HELP router_redirects_followed_total Redirects followed internally
# TYPE router_redirects_followed_total counter
router_redirects_followed_total {}

# HELP router_navigation_latency_seconds Navigation latency percentiles
# TYPE router_navigation_latency_seconds summary
router_navigation_latency_seconds{{quantile="0.5"}} {}
router_navigation_latency_seconds{{quantile="0.9"}} {}
router_navigation_latency_seconds{{quantile="0.95"}} {}
router_navigation_latency_seconds{{quantile="0.99"}} {}
"#,
            metrics.total_navigations,
            metrics.committed,
            metrics.denied,
            metrics.not_found,
            metrics.redirected,
            metrics.redirect_loops,
            metrics.cancelled,
            metrics.redirects_followed,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p95_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
        )
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> NavigationOutcome {
        NavigationOutcome::NotFound {
            path: "nope".to_string(),
            unmatched: vec!["nope".to_string()],
        }
    }

    #[tokio::test]
    async fn test_metrics_creation() {
        let collector = MetricsCollector::new();
        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.total_navigations, 0);
        assert_eq!(metrics.commit_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_record_outcome() {
        let collector = MetricsCollector::new();

        collector.record_outcome(&not_found()).await;
        collector
            .record_outcome(&NavigationOutcome::Cancelled {
                path: "home".to_string(),
            })
            .await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_navigations, 2);
        assert_eq!(metrics.not_found, 1);
        assert_eq!(metrics.cancelled, 1);
        assert_eq!(metrics.committed, 0);
    }

    #[tokio::test]
    async fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5)).await;
        collector.record_latency(Duration::from_millis(10)).await;
        collector.record_latency(Duration::from_millis(15)).await;

        let metrics = collector.get_metrics().await;
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p50_ms > 0.0);
        assert!(metrics.latency_p99_ms > 0.0);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let collector = MetricsCollector::new();

        collector.record_outcome(&not_found()).await;
        collector.record_latency(Duration::from_millis(5)).await;

        let prometheus = collector.export_prometheus().await;
        assert!(prometheus.contains("router_navigations_total 1"));
        assert!(prometheus.contains("router_navigation_outcomes_total{outcome=\"not_found\"} 1"));
    }

    #[tokio::test]
    async fn test_reset() {
        let collector = MetricsCollector::new();

        collector.record_outcome(&not_found()).await;
        collector.reset().await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_navigations, 0);
        assert_eq!(metrics.not_found, 0);
    }
}
