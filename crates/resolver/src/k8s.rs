//! Kubernetes service resolver - endpoints watch with reconnect backoff
//!
//! The Kubernetes API client itself is an external collaborator: the
//! resolver is written against the [`EndpointsApi`] seam and only owns
//! the membership semantics - delta application, coalesced adoption, and
//! reconnection with exponential backoff.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use steer_ring::Endpoint;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::notify::ChangeNotifier;
use crate::{ChangeCallback, ResolveError, Resolver};

const BACKOFF_BASE_MS: u64 = 100;
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// A change to the watched service's Ready addresses
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Addresses became Ready
    Added(Vec<String>),
    /// The full Ready address set was replaced
    Modified(Vec<String>),
    /// Addresses left the Ready set
    Deleted(Vec<String>),
}

/// An open watch on one service's endpoints
#[async_trait]
pub trait EndpointsStream: Send {
    /// Next event, or `None` when the watch disconnects
    async fn next(&mut self) -> Option<WatchEvent>;
}

/// Client surface for listing and watching a service's endpoints
#[async_trait]
pub trait EndpointsApi: Send + Sync {
    /// Current Ready addresses of the service
    async fn list(&self, service: &str, namespace: &str) -> Result<Vec<String>, ResolveError>;

    /// Open a watch on the service's endpoints
    async fn watch(
        &self,
        service: &str,
        namespace: &str,
    ) -> Result<Box<dyn EndpointsStream>, ResolveError>;
}

/// Resolver that follows a Kubernetes Service's Ready endpoints.
///
/// Each Ready address crossed with each configured port becomes one
/// backend endpoint. Watch events apply as deltas to a retained address
/// set; the change callback fires only when the resulting endpoint set
/// actually differs from the last adopted one. A dropped watch
/// reconnects with exponential backoff and re-lists on reconnect; the
/// adopted membership is retained throughout.
pub struct K8sSvcResolver {
    api: Arc<dyn EndpointsApi>,
    service: String,
    namespace: String,
    ports: Vec<u16>,
    addresses: Arc<AsyncMutex<BTreeSet<String>>>,
    notifier: Arc<ChangeNotifier>,
    stop: Mutex<Option<CancellationToken>>,
    task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl K8sSvcResolver {
    /// Create a resolver for `svc[.namespace]` emitting one endpoint per
    /// Ready address and port.
    ///
    /// Fails when the service name or the port list is empty.
    pub fn new(
        api: Arc<dyn EndpointsApi>,
        service: &str,
        ports: Vec<u16>,
    ) -> Result<Self, ResolveError> {
        let (service, namespace) = match service.split_once('.') {
            Some((svc, ns)) => (svc.to_string(), ns.to_string()),
            None => (service.to_string(), "default".to_string()),
        };
        if service.is_empty() {
            return Err(ResolveError::NoService);
        }
        if ports.is_empty() {
            return Err(ResolveError::NoPorts);
        }

        Ok(Self {
            api,
            service,
            namespace,
            ports,
            addresses: Arc::new(AsyncMutex::new(BTreeSet::new())),
            notifier: Arc::new(ChangeNotifier::new()),
            stop: Mutex::new(None),
            task: AsyncMutex::new(None),
        })
    }
}

#[async_trait]
impl Resolver for K8sSvcResolver {
    fn on_change(&self, callback: ChangeCallback) {
        self.notifier.set_callback(callback);
    }

    async fn start(&self) -> Result<(), ResolveError> {
        // Initial list is fatal and adopts inline.
        let initial = self.api.list(&self.service, &self.namespace).await?;
        {
            let mut addresses = self.addresses.lock().await;
            *addresses = initial.into_iter().collect();
            let endpoints = endpoints_from(&addresses, &self.ports);
            drop(addresses);
            self.notifier.maybe_adopt(endpoints).await;
        }

        let token = CancellationToken::new();
        *self.stop.lock() = Some(token.clone());

        let api = Arc::clone(&self.api);
        let addresses = Arc::clone(&self.addresses);
        let notifier = Arc::clone(&self.notifier);
        let service = self.service.clone();
        let namespace = self.namespace.clone();
        let ports = self.ports.clone();

        let handle = tokio::spawn(async move {
            watch_loop(token, api, service, namespace, ports, addresses, notifier).await;
        });
        *self.task.lock().await = Some(handle);

        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ResolveError> {
        if let Some(token) = self.stop.lock().take() {
            token.cancel();
        }
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<Vec<Endpoint>, ResolveError> {
        let listed = self.api.list(&self.service, &self.namespace).await?;
        let addresses: BTreeSet<String> = listed.into_iter().collect();
        Ok(endpoints_from(&addresses, &self.ports))
    }
}

/// Watch, apply deltas, reconnect on disconnect
async fn watch_loop(
    token: CancellationToken,
    api: Arc<dyn EndpointsApi>,
    service: String,
    namespace: String,
    ports: Vec<u16>,
    addresses: Arc<AsyncMutex<BTreeSet<String>>>,
    notifier: Arc<ChangeNotifier>,
) {
    let mut attempt = 0u32;

    'reconnect: loop {
        if token.is_cancelled() {
            break;
        }

        let mut stream = match api.watch(&service, &namespace).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(
                    service = %service,
                    error = %error,
                    "endpoints watch failed, reconnecting"
                );
                if sleep_backoff(&token, attempt).await {
                    break;
                }
                attempt += 1;
                continue;
            }
        };
        attempt = 0;

        // Re-sync after (re)connect: anything missed while disconnected
        // lands as one Modified-style replacement.
        match api.list(&service, &namespace).await {
            Ok(listed) => {
                apply_and_adopt(
                    &addresses,
                    &notifier,
                    &ports,
                    WatchEvent::Modified(listed),
                )
                .await;
            }
            Err(error) => tracing::warn!(
                service = %service,
                error = %error,
                "endpoints re-list failed, keeping last adopted set"
            ),
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => break 'reconnect,
                event = stream.next() => match event {
                    Some(event) => {
                        apply_and_adopt(&addresses, &notifier, &ports, event).await;
                    }
                    None => {
                        tracing::warn!(service = %service, "endpoints watch disconnected");
                        if sleep_backoff(&token, attempt).await {
                            break 'reconnect;
                        }
                        attempt += 1;
                        continue 'reconnect;
                    }
                },
            }
        }
    }

    tracing::debug!(service = %service, "k8s resolver loop stopped");
}

/// Apply one event to the address set and adopt the resulting endpoints
async fn apply_and_adopt(
    addresses: &AsyncMutex<BTreeSet<String>>,
    notifier: &ChangeNotifier,
    ports: &[u16],
    event: WatchEvent,
) {
    let endpoints = {
        let mut addresses = addresses.lock().await;
        match event {
            WatchEvent::Added(added) => addresses.extend(added),
            WatchEvent::Modified(replaced) => *addresses = replaced.into_iter().collect(),
            WatchEvent::Deleted(deleted) => {
                for address in &deleted {
                    addresses.remove(address);
                }
            }
        }
        endpoints_from(&addresses, ports)
    };

    notifier.maybe_adopt(endpoints).await;
}

/// Cross every address with every port, canonical sorted
fn endpoints_from(addresses: &BTreeSet<String>, ports: &[u16]) -> Vec<Endpoint> {
    let mut endpoints: Vec<Endpoint> = addresses
        .iter()
        .flat_map(|address| {
            ports
                .iter()
                .map(move |port| Endpoint::canonical(&format!("{address}:{port}")))
        })
        .collect();
    endpoints.sort();
    endpoints.dedup();
    endpoints
}

/// Sleep the backoff delay; returns true when cancelled
async fn sleep_backoff(token: &CancellationToken, attempt: u32) -> bool {
    let delay =
        Duration::from_millis(BACKOFF_BASE_MS * (1u64 << attempt.min(7))).min(BACKOFF_CAP);
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
