//! Shared doubles for balancer tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use steer_resolver::{ChangeCallback, ResolveError, Resolver};
use steer_ring::Endpoint;
use steer_signal::{Logs, Metrics, Traces};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::ExporterError;
use crate::exporter::{ComponentFactory, Exporter, Host};

/// Backend exporter double: records every consume call, can fail
/// start/consume, and can block consume on an async mutex so tests
/// control in-flight windows.
pub(crate) struct TestExporter {
    pub endpoint: Endpoint,
    pub traces: StdMutex<Vec<Traces>>,
    pub metrics: StdMutex<Vec<Metrics>>,
    pub logs: StdMutex<Vec<Logs>>,
    pub started: AtomicBool,
    pub shut_down: AtomicBool,
    pub fail_start: bool,
    pub fail_consume: AtomicBool,
    /// Tests hold this lock to keep consume calls in flight
    pub consume_gate: Arc<AsyncMutex<()>>,
}

impl TestExporter {
    pub fn new(endpoint: Endpoint, fail_start: bool) -> Self {
        Self {
            endpoint,
            traces: StdMutex::new(Vec::new()),
            metrics: StdMutex::new(Vec::new()),
            logs: StdMutex::new(Vec::new()),
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            fail_start,
            fail_consume: AtomicBool::new(false),
            consume_gate: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn trace_calls(&self) -> usize {
        self.traces.lock().unwrap().len()
    }

    pub fn metric_calls(&self) -> usize {
        self.metrics.lock().unwrap().len()
    }

    fn check_consume(&self) -> Result<(), ExporterError> {
        if self.fail_consume.load(Ordering::SeqCst) {
            Err(ExporterError::Consume("synthetic backend failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Exporter for TestExporter {
    async fn start(&self, _host: Host) -> Result<(), ExporterError> {
        if self.fail_start {
            return Err(ExporterError::Start("synthetic start failure".into()));
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExporterError> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn consume_traces(&self, traces: Traces) -> Result<(), ExporterError> {
        let _gate = self.consume_gate.lock().await;
        self.check_consume()?;
        self.traces.lock().unwrap().push(traces);
        Ok(())
    }

    async fn consume_metrics(&self, metrics: Metrics) -> Result<(), ExporterError> {
        let _gate = self.consume_gate.lock().await;
        self.check_consume()?;
        self.metrics.lock().unwrap().push(metrics);
        Ok(())
    }

    async fn consume_logs(&self, logs: Logs) -> Result<(), ExporterError> {
        let _gate = self.consume_gate.lock().await;
        self.check_consume()?;
        self.logs.lock().unwrap().push(logs);
        Ok(())
    }
}

/// Builds `TestExporter`s and keeps them reachable for assertions
#[derive(Default)]
pub(crate) struct ExporterRegistry {
    pub exporters: StdMutex<HashMap<Endpoint, Arc<TestExporter>>>,
    /// Endpoints whose factory call fails
    pub fail_factory: StdMutex<HashSet<String>>,
    /// Endpoints whose exporter start fails
    pub fail_start: StdMutex<HashSet<String>>,
    pub factory_calls: AtomicUsize,
}

impl ExporterRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn factory(self: &Arc<Self>) -> ComponentFactory {
        let registry = Arc::clone(self);
        Arc::new(move |endpoint| {
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                registry.factory_calls.fetch_add(1, Ordering::SeqCst);

                if registry
                    .fail_factory
                    .lock()
                    .unwrap()
                    .contains(endpoint.as_str())
                {
                    return Err(ExporterError::Factory {
                        endpoint: endpoint.to_string(),
                        message: "synthetic factory failure".into(),
                    });
                }

                let fail_start = registry
                    .fail_start
                    .lock()
                    .unwrap()
                    .contains(endpoint.as_str());
                let exporter = Arc::new(TestExporter::new(endpoint.clone(), fail_start));
                registry
                    .exporters
                    .lock()
                    .unwrap()
                    .insert(endpoint, Arc::clone(&exporter));
                Ok(exporter as Arc<dyn Exporter>)
            })
        })
    }

    pub fn get(&self, endpoint: &str) -> Arc<TestExporter> {
        Arc::clone(
            self.exporters
                .lock()
                .unwrap()
                .get(&Endpoint::canonical(endpoint))
                .unwrap_or_else(|| panic!("no exporter built for {endpoint}")),
        )
    }
}

/// Resolver double driven directly by the test
pub(crate) struct ManualResolver {
    callback: StdMutex<Option<ChangeCallback>>,
    current: StdMutex<Vec<Endpoint>>,
}

impl ManualResolver {
    pub fn new(initial: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            callback: StdMutex::new(None),
            current: StdMutex::new(canonical(initial)),
        })
    }

    /// Publish a new membership set through the registered callback
    pub async fn push(&self, endpoints: &[&str]) {
        let set = canonical(endpoints);
        *self.current.lock().unwrap() = set.clone();
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(set).await;
        }
    }
}

#[async_trait]
impl Resolver for ManualResolver {
    fn on_change(&self, callback: ChangeCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    async fn start(&self) -> Result<(), ResolveError> {
        let set = self.current.lock().unwrap().clone();
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(set).await;
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ResolveError> {
        Ok(())
    }

    async fn resolve(&self) -> Result<Vec<Endpoint>, ResolveError> {
        Ok(self.current.lock().unwrap().clone())
    }
}

fn canonical(endpoints: &[&str]) -> Vec<Endpoint> {
    let mut set: Vec<Endpoint> = endpoints.iter().map(|e| Endpoint::canonical(e)).collect();
    set.sort();
    set.dedup();
    set
}
