//! Per-backend dispatch metrics

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use steer_metrics::{BackendMetricsProvider, BackendSnapshot, BackendStats};
use steer_ring::Endpoint;

/// Outcome and latency counters for every backend the dispatcher has
/// talked to.
///
/// Recording is lock-free after the first call per endpoint; the map
/// lock is only written when a new endpoint appears.
#[derive(Debug, Default)]
pub struct BalancerMetrics {
    stats: RwLock<HashMap<Endpoint, Arc<BackendStats>>>,
}

impl BalancerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one backend call tagged by endpoint and outcome
    pub fn record(&self, endpoint: &Endpoint, success: bool, latency: Duration) {
        let stats = self.stats.read().get(endpoint).cloned();
        let stats = match stats {
            Some(stats) => stats,
            None => Arc::clone(
                self.stats
                    .write()
                    .entry(endpoint.clone())
                    .or_insert_with(|| Arc::new(BackendStats::new())),
            ),
        };
        stats.record(success, latency);
    }

    /// Snapshot every backend's counters, sorted by endpoint
    pub fn snapshot(&self) -> Vec<BackendSnapshot> {
        let stats = self.stats.read();
        let mut snapshots: Vec<BackendSnapshot> = stats
            .iter()
            .map(|(endpoint, stats)| stats.snapshot(endpoint.as_str()))
            .collect();
        snapshots.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        snapshots
    }
}

/// Handle for collecting balancer metrics externally
///
/// Remains valid after the balancer is shared into routers; implements
/// [`BackendMetricsProvider`] for the unified reporter surface.
#[derive(Clone)]
pub struct BalancerMetricsHandle {
    id: String,
    metrics: Arc<BalancerMetrics>,
}

impl BalancerMetricsHandle {
    pub(crate) fn new(id: impl Into<String>, metrics: Arc<BalancerMetrics>) -> Self {
        Self {
            id: id.into(),
            metrics,
        }
    }
}

impl BackendMetricsProvider for BalancerMetricsHandle {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> Vec<BackendSnapshot> {
        self.metrics.snapshot()
    }
}
