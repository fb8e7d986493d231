//! Backend exporter seam and the lifecycle wrapper
//!
//! The concrete signal-push client is an external collaborator: the
//! dispatcher only sees the [`Exporter`] trait and builds instances
//! through a [`ComponentFactory`] closure. [`WrappedExporter`] adds the
//! lifecycle the dispatcher needs - state tracking and in-flight
//! accounting so a removed backend drains before it is torn down.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use steer_ring::Endpoint;
use steer_signal::{Logs, Metrics, Traces};
use tokio::sync::Notify;

use crate::error::{BalancerError, ExporterError};

/// Opaque handle passed to every exporter at start.
///
/// Carries whatever the embedding process wants to expose to exporters
/// (shared clients, registries). The dispatcher only stores and forwards
/// it.
#[derive(Clone)]
pub struct Host(Arc<dyn Any + Send + Sync>);

impl Host {
    /// Wrap a value for exporters to downcast
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// A handle carrying nothing
    pub fn empty() -> Self {
        Self(Arc::new(()))
    }

    /// Borrow the carried value as `T`, if it is one
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

/// One backend signal-push exporter.
///
/// Implementations own their connection handling, queuing, and retry
/// behavior; the dispatcher never retries on their behalf.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn start(&self, host: Host) -> Result<(), ExporterError>;
    async fn shutdown(&self) -> Result<(), ExporterError>;
    async fn consume_traces(&self, traces: Traces) -> Result<(), ExporterError>;
    async fn consume_metrics(&self, metrics: Metrics) -> Result<(), ExporterError>;
    async fn consume_logs(&self, logs: Logs) -> Result<(), ExporterError>;
}

/// Builds one exporter per resolved endpoint, configured identically to
/// the user's template except for the endpoint itself.
pub type ComponentFactory = Arc<
    dyn Fn(Endpoint) -> BoxFuture<'static, Result<Arc<dyn Exporter>, ExporterError>>
        + Send
        + Sync,
>;

const STATE_CREATED: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_DRAINING: u8 = 2;
const STATE_STOPPED: u8 = 3;

/// Lifecycle wrapper around one backend exporter.
///
/// Tracks the number of in-flight consume calls so that
/// [`shutdown`](WrappedExporter::shutdown) does not return until every
/// call that was admitted has completed. New work is admitted through
/// [`acquire`](WrappedExporter::acquire) and rejected once draining
/// begins.
pub struct WrappedExporter {
    inner: Arc<dyn Exporter>,
    endpoint: Endpoint,
    state: AtomicU8,
    inflight: AtomicUsize,
    drained: Notify,
}

impl WrappedExporter {
    /// Wrap a freshly built exporter for `endpoint`
    pub fn new(inner: Arc<dyn Exporter>, endpoint: Endpoint) -> Self {
        Self {
            inner,
            endpoint,
            state: AtomicU8::new(STATE_CREATED),
            inflight: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// The endpoint this exporter pushes to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Start the inner exporter and begin admitting work
    pub async fn start(&self, host: Host) -> Result<(), ExporterError> {
        self.inner.start(host).await?;
        self.state.store(STATE_STARTED, Ordering::Release);
        Ok(())
    }

    /// Take one in-flight reference.
    ///
    /// The returned guard must be held across the consume call; dropping
    /// it releases the reference. Fails once the exporter is draining or
    /// stopped.
    pub fn acquire(self: &Arc<Self>) -> Result<InflightGuard, BalancerError> {
        // Increment first so a concurrent shutdown that observes the
        // started state also observes this reference.
        self.inflight.fetch_add(1, Ordering::AcqRel);
        if self.state.load(Ordering::Acquire) != STATE_STARTED {
            self.release();
            return Err(BalancerError::Draining {
                endpoint: self.endpoint.to_string(),
            });
        }
        Ok(InflightGuard {
            exporter: Arc::clone(self),
        })
    }

    fn release(&self) {
        if self.inflight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Current number of in-flight consume calls
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    /// Drain and shut down.
    ///
    /// Stops admitting new work, waits until the in-flight count reaches
    /// zero, then shuts the inner exporter down. When this returns, no
    /// consume call is in progress on this exporter.
    pub async fn shutdown(&self) -> Result<(), ExporterError> {
        if self.state.swap(STATE_DRAINING, Ordering::AcqRel) == STATE_STOPPED {
            self.state.store(STATE_STOPPED, Ordering::Release);
            return Ok(());
        }

        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register interest before re-checking, so a release racing
            // with this check still wakes the drain.
            notified.as_mut().enable();
            if self.inflight.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }

        let result = self.inner.shutdown().await;
        self.state.store(STATE_STOPPED, Ordering::Release);
        result
    }

    pub async fn consume_traces(&self, traces: Traces) -> Result<(), ExporterError> {
        self.inner.consume_traces(traces).await
    }

    pub async fn consume_metrics(&self, metrics: Metrics) -> Result<(), ExporterError> {
        self.inner.consume_metrics(metrics).await
    }

    pub async fn consume_logs(&self, logs: Logs) -> Result<(), ExporterError> {
        self.inner.consume_logs(logs).await
    }
}

impl fmt::Debug for WrappedExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedExporter")
            .field("endpoint", &self.endpoint)
            .field("inflight", &self.inflight())
            .finish()
    }
}

/// One in-flight reference on a wrapped exporter
#[derive(Debug)]
pub struct InflightGuard {
    exporter: Arc<WrappedExporter>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.exporter.release();
    }
}
