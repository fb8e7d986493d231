//! DNS resolver - periodic forward lookup of one hostname

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use steer_ring::{Endpoint, DEFAULT_PORT};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::notify::ChangeNotifier;
use crate::{ChangeCallback, ResolveError, Resolver};

/// Default poll interval between lookups
pub const DEFAULT_DNS_INTERVAL: Duration = Duration::from_secs(5);

/// Default per-lookup deadline
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(1);

/// Forward-lookup function, injectable for tests
type LookupFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, std::io::Result<Vec<SocketAddr>>> + Send + Sync>;

/// Resolver that polls a DNS name and adopts the returned address set.
///
/// Each tick performs a forward A/AAAA lookup of the hostname, bounded by
/// the configured timeout. Every returned address is paired with the
/// configured port (4317 when unspecified) and the sorted result is
/// compared against the last adopted set. A failed tick keeps the
/// previous membership.
pub struct DnsResolver {
    hostname: String,
    port: u16,
    interval: Duration,
    timeout: Duration,
    lookup: LookupFn,
    notifier: Arc<ChangeNotifier>,
    stop: Mutex<Option<CancellationToken>>,
    task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl DnsResolver {
    /// Create a DNS resolver.
    ///
    /// Fails when `hostname` is empty or `interval` is zero. `port`
    /// defaults to 4317; `interval` and `timeout` default to 5s and 1s.
    pub fn new(
        hostname: impl Into<String>,
        port: Option<u16>,
        interval: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<Self, ResolveError> {
        let hostname = hostname.into();
        if hostname.is_empty() {
            return Err(ResolveError::NoHostname);
        }

        let interval = interval.unwrap_or(DEFAULT_DNS_INTERVAL);
        if interval.is_zero() {
            return Err(ResolveError::InvalidInterval);
        }

        Ok(Self {
            hostname,
            port: port.unwrap_or(DEFAULT_PORT),
            interval,
            timeout: timeout.unwrap_or(DEFAULT_DNS_TIMEOUT),
            lookup: Arc::new(|target| {
                Box::pin(async move {
                    tokio::net::lookup_host(target)
                        .await
                        .map(|addrs| addrs.collect())
                })
            }),
            notifier: Arc::new(ChangeNotifier::new()),
            stop: Mutex::new(None),
            task: AsyncMutex::new(None),
        })
    }

    /// Replace the lookup function (tests drive resolution without a
    /// real nameserver)
    #[cfg(test)]
    pub(crate) fn with_lookup(mut self, lookup: LookupFn) -> Self {
        self.lookup = lookup;
        self
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    fn on_change(&self, callback: ChangeCallback) {
        self.notifier.set_callback(callback);
    }

    async fn start(&self) -> Result<(), ResolveError> {
        // The initial resolution is fatal and adopts inline, so the
        // caller observes the first membership event before start
        // returns.
        let endpoints = self.resolve().await?;
        self.notifier.maybe_adopt(endpoints).await;

        let token = CancellationToken::new();
        *self.stop.lock() = Some(token.clone());

        let lookup = Arc::clone(&self.lookup);
        let notifier = Arc::clone(&self.notifier);
        let hostname = self.hostname.clone();
        let (port, interval, timeout) = (self.port, self.interval, self.timeout);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // Consume the immediate first tick; start already resolved.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match lookup_endpoints(&lookup, &hostname, port, timeout).await {
                            Ok(endpoints) => {
                                notifier.maybe_adopt(endpoints).await;
                            }
                            Err(error) => tracing::warn!(
                                hostname = %hostname,
                                error = %error,
                                "membership resolution failed, keeping last adopted set"
                            ),
                        }
                    }
                }
            }

            tracing::debug!(hostname = %hostname, "dns resolver loop stopped");
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
        lookup_endpoints(&self.lookup, &self.hostname, self.port, self.timeout).await
    }
}

/// One bounded lookup, returning the canonical sorted endpoint set
async fn lookup_endpoints(
    lookup: &LookupFn,
    hostname: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<Endpoint>, ResolveError> {
    let addrs = tokio::time::timeout(timeout, lookup(format!("{hostname}:{port}")))
        .await
        .map_err(|_| ResolveError::LookupTimeout {
            hostname: hostname.to_string(),
            timeout,
        })?
        .map_err(|source| ResolveError::Lookup {
            hostname: hostname.to_string(),
            source,
        })?;

    let mut endpoints: Vec<Endpoint> = addrs
        .iter()
        .map(|addr| Endpoint::canonical(&format!("{}:{port}", addr.ip())))
        .collect();
    endpoints.sort();
    endpoints.dedup();
    Ok(endpoints)
}
