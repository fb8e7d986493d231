//! Load balancer - ring ownership and the live exporter map
//!
//! The dispatcher owns the hash ring and one started exporter per
//! resolved endpoint. Membership events from the resolver swap the ring
//! and apply the exporter delta atomically under one writer lock, so a
//! concurrent lookup observes either the pre- or post-update state,
//! never a torn one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use steer_resolver::Resolver;
use steer_ring::{Endpoint, HashRing};
use tokio::sync::{Notify, RwLock};

use crate::error::BalancerError;
use crate::exporter::{ComponentFactory, Host, WrappedExporter};
use crate::metrics::{BalancerMetrics, BalancerMetricsHandle};

/// Ring and exporter map, guarded together.
///
/// The two fields stay separate (rather than one swap-all snapshot) so
/// the exporter map survives ring swaps for in-flight draining.
#[derive(Default)]
struct Inner {
    ring: Option<HashRing>,
    exporters: HashMap<Endpoint, Arc<WrappedExporter>>,
}

/// Consistent-hashing dispatcher over a dynamic backend set.
///
/// # Design
///
/// - The resolver pushes full membership sets; an unchanged set is
///   detected by ring equality and skips all work
/// - `exporter_for` takes the read lock only and performs no I/O
/// - Removed exporters drain on their own task; `shutdown` waits on the
///   drain group so nothing leaks past process teardown
pub struct LoadBalancer {
    resolver: Arc<dyn Resolver>,
    component_factory: ComponentFactory,
    inner: RwLock<Inner>,
    host: Mutex<Option<Host>>,
    stopped: AtomicBool,
    drain: Arc<WaitGroup>,
    metrics: Arc<BalancerMetrics>,
}

impl LoadBalancer {
    /// Create a dispatcher over `resolver`, building per-endpoint
    /// exporters with `component_factory`
    pub fn new(resolver: Arc<dyn Resolver>, component_factory: ComponentFactory) -> Self {
        Self {
            resolver,
            component_factory,
            inner: RwLock::new(Inner::default()),
            host: Mutex::new(None),
            stopped: AtomicBool::new(false),
            drain: Arc::new(WaitGroup::new()),
            metrics: Arc::new(BalancerMetrics::new()),
        }
    }

    /// Register with the resolver and start it.
    ///
    /// The resolver adopts its initial membership inline, so the ring
    /// and exporter map are populated before `start` returns.
    pub async fn start(self: &Arc<Self>, host: Host) -> Result<(), BalancerError> {
        *self.host.lock() = Some(host);

        let weak = Arc::downgrade(self);
        self.resolver.on_change(Arc::new(move |resolved| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(balancer) = weak.upgrade() {
                    balancer.on_backend_changes(resolved).await;
                }
            })
        }));

        self.resolver.start().await?;
        Ok(())
    }

    /// Apply one membership event
    async fn on_backend_changes(&self, resolved: Vec<Endpoint>) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }

        let new_ring = HashRing::new(&resolved);

        // Unchanged membership builds an identical ring: nothing to do,
        // and the write lock is never taken.
        {
            let inner = self.inner.read().await;
            if inner.ring.as_ref() == Some(&new_ring) {
                return;
            }
        }

        let mut inner = self.inner.write().await;
        inner.ring = Some(new_ring);
        tracing::info!(backends = resolved.len(), "backend membership updated");

        self.add_missing(&mut inner, &resolved).await;
        self.remove_extra(&mut inner, &resolved);
    }

    /// Build and start an exporter for every resolved endpoint that has
    /// none yet.
    ///
    /// A factory or start failure is logged and skipped: the ring still
    /// points at the endpoint, so lookups fail until the next membership
    /// event retries it.
    async fn add_missing(&self, inner: &mut Inner, resolved: &[Endpoint]) {
        let host = self.host.lock().clone().unwrap_or_default();

        for endpoint in resolved {
            if inner.exporters.contains_key(endpoint) {
                continue;
            }

            let exporter = match (self.component_factory)(endpoint.clone()).await {
                Ok(exporter) => exporter,
                Err(error) => {
                    tracing::error!(
                        endpoint = %endpoint,
                        error = %error,
                        "failed to create exporter for endpoint"
                    );
                    continue;
                }
            };

            let wrapped = Arc::new(WrappedExporter::new(exporter, endpoint.clone()));
            if let Err(error) = wrapped.start(host.clone()).await {
                tracing::error!(
                    endpoint = %endpoint,
                    error = %error,
                    "failed to start exporter for endpoint"
                );
                continue;
            }

            inner.exporters.insert(endpoint.clone(), wrapped);
        }
    }

    /// Remove exporters whose endpoint left the membership.
    ///
    /// Draining happens off-task so the resolver callback never blocks
    /// on in-flight batches; the drain group keeps process shutdown
    /// honest.
    fn remove_extra(&self, inner: &mut Inner, resolved: &[Endpoint]) {
        let removed: Vec<Endpoint> = inner
            .exporters
            .keys()
            .filter(|endpoint| !resolved.contains(endpoint))
            .cloned()
            .collect();

        for endpoint in removed {
            let Some(exporter) = inner.exporters.remove(&endpoint) else {
                continue;
            };
            let guard = self.drain.enter();
            tokio::spawn(async move {
                if let Err(error) = exporter.shutdown().await {
                    tracing::error!(
                        endpoint = %exporter.endpoint(),
                        error = %error,
                        "failed to shut down removed exporter"
                    );
                }
                drop(guard);
            });
        }
    }

    /// The exporter owning `key` on the current ring.
    ///
    /// Never blocks on I/O; only waits for the state lock. Fails with
    /// [`BalancerError::NotReady`] before the first membership event and
    /// with [`BalancerError::ExporterNotFound`] in the transient window
    /// where the ring and the exporter map disagree.
    pub async fn exporter_for(
        &self,
        key: &[u8],
    ) -> Result<(Arc<WrappedExporter>, Endpoint), BalancerError> {
        let inner = self.inner.read().await;
        let ring = match inner.ring.as_ref() {
            Some(ring) if !ring.is_empty() => ring,
            _ => return Err(BalancerError::NotReady),
        };

        let endpoint = ring.endpoint_for(key).clone();
        match inner.exporters.get(&endpoint) {
            Some(exporter) => Ok((Arc::clone(exporter), endpoint)),
            None => Err(BalancerError::ExporterNotFound {
                endpoint: endpoint.to_string(),
            }),
        }
    }

    /// Stop the resolver, shut down every remaining exporter, and wait
    /// for off-task drains to finish
    pub async fn shutdown(&self) -> Result<(), BalancerError> {
        self.stopped.store(true, Ordering::Release);
        self.resolver.shutdown().await?;

        let remaining: Vec<(Endpoint, Arc<WrappedExporter>)> =
            self.inner.write().await.exporters.drain().collect();
        for (endpoint, exporter) in remaining {
            if let Err(error) = exporter.shutdown().await {
                tracing::error!(
                    endpoint = %endpoint,
                    error = %error,
                    "failed to shut down exporter"
                );
            }
        }

        self.drain.wait().await;
        Ok(())
    }

    /// Per-backend dispatch metrics
    pub fn metrics(&self) -> &BalancerMetrics {
        &self.metrics
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> BalancerMetricsHandle {
        BalancerMetricsHandle::new("loadbalancer", Arc::clone(&self.metrics))
    }
}

/// Async analog of a wait group: counts outstanding drain tasks and
/// wakes `wait` when the count returns to zero.
struct WaitGroup {
    count: AtomicUsize,
    zero: Notify,
}

impl WaitGroup {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            zero: Notify::new(),
        }
    }

    fn enter(self: &Arc<Self>) -> WaitGroupGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        WaitGroupGuard(Arc::clone(self))
    }

    async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            tokio::pin!(notified);
            // Register interest before re-checking the count, so a guard
            // dropped in between still wakes this waiter.
            notified.as_mut().enable();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct WaitGroupGuard(Arc<WaitGroup>);

impl Drop for WaitGroupGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.zero.notify_waiters();
        }
    }
}
