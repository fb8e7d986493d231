//! Steer Metrics - Provider traits for per-backend statistics
//!
//! The dispatcher tags every backend call with its endpoint and outcome.
//! This crate defines the atomic counter struct those records land in and
//! the provider trait an embedding process uses to collect them without
//! knowing the concrete dispatcher types.
//!
//! # Design
//!
//! - Counters use atomics, so recording never takes a lock
//! - `snapshot()` returns plain serializable values safe to hold across
//!   reporting intervals

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-backend outcome and latency counters
///
/// All fields use atomics for lock-free updates from concurrent
/// dispatch tasks.
#[derive(Debug, Default)]
pub struct BackendStats {
    /// Successful backend calls
    pub success_count: AtomicU64,
    /// Failed backend calls
    pub failure_count: AtomicU64,
    /// Cumulative backend call latency in milliseconds
    pub latency_ms_total: AtomicU64,
}

impl BackendStats {
    /// Create new stats with all counters at zero
    pub const fn new() -> Self {
        Self {
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            latency_ms_total: AtomicU64::new(0),
        }
    }

    /// Record one backend call outcome and its latency
    #[inline]
    pub fn record(&self, success: bool, latency: Duration) {
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_ms_total
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Take a snapshot of current values for `endpoint`
    pub fn snapshot(&self, endpoint: impl Into<String>) -> BackendSnapshot {
        let success_count = self.success_count.load(Ordering::Relaxed);
        let failure_count = self.failure_count.load(Ordering::Relaxed);
        BackendSnapshot {
            endpoint: endpoint.into(),
            success_count,
            failure_count,
            latency_ms_total: self.latency_ms_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of one backend's counters
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BackendSnapshot {
    pub endpoint: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub latency_ms_total: u64,
}

impl BackendSnapshot {
    /// Mean latency per recorded call
    pub fn avg_latency_ms(&self) -> u64 {
        let calls = self.success_count + self.failure_count;
        if calls == 0 {
            0
        } else {
            self.latency_ms_total / calls
        }
    }
}

/// Trait for components that expose per-backend statistics
///
/// The dispatcher implements this; a reporter collects snapshots on its
/// own interval without holding references into dispatcher internals.
pub trait BackendMetricsProvider: Send + Sync {
    /// Identifier of the providing component
    fn provider_id(&self) -> &str;

    /// Snapshot of every known backend's counters
    fn snapshot(&self) -> Vec<BackendSnapshot>;
}
