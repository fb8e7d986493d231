//! Steer Resolver - Backend membership producers
//!
//! A resolver is a long-lived producer of backend endpoint sets. It owns
//! the adoption policy: after each resolution attempt the result is
//! canonicalized and compared (as a sorted set) against the last adopted
//! membership; only a real change invokes the registered callback, and
//! callbacks are never invoked concurrently with each other.
//!
//! Three producers are provided:
//! - [`StaticResolver`] - a fixed hostname list, resolved once at start
//! - [`DnsResolver`] - periodic forward A/AAAA lookup of one hostname
//! - [`K8sSvcResolver`] - watch on a Kubernetes Service's endpoints,
//!   driven through an injected [`EndpointsApi`] client
//!
//! A failed resolution attempt never clears the last adopted set: the
//! previous membership keeps serving until a successful attempt produces
//! a different one.

mod dns;
mod error;
mod k8s;
mod notify;
mod static_list;

pub use dns::{DnsResolver, DEFAULT_DNS_INTERVAL, DEFAULT_DNS_TIMEOUT};
pub use error::ResolveError;
pub use k8s::{EndpointsApi, EndpointsStream, K8sSvcResolver, WatchEvent};
pub use static_list::StaticResolver;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use steer_ring::Endpoint;

/// Callback invoked with the full adopted endpoint set on every change.
pub type ChangeCallback = Arc<dyn Fn(Vec<Endpoint>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A long-lived producer of backend endpoint sets.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Register the change callback. A single callback is supported;
    /// registering again replaces the previous one. Must be called
    /// before [`start`](Resolver::start) so the initial adoption is
    /// observed.
    fn on_change(&self, callback: ChangeCallback);

    /// Begin producing membership events.
    ///
    /// The initial resolution happens inline: when `start` returns, the
    /// first adoption (and its callback) has already completed. Fails
    /// when the initial resolution fails in a way the variant deems
    /// fatal.
    async fn start(&self) -> Result<(), ResolveError>;

    /// Stop producing. After `shutdown` returns no further callback is
    /// invoked.
    async fn shutdown(&self) -> Result<(), ResolveError>;

    /// One resolution attempt, returning the canonical sorted set.
    async fn resolve(&self) -> Result<Vec<Endpoint>, ResolveError>;
}

/// Canonicalize, sort, and dedup a raw endpoint list
pub(crate) fn canonical_set<I, S>(raw: I) -> Vec<Endpoint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut endpoints: Vec<Endpoint> = raw
        .into_iter()
        .map(|r| Endpoint::canonical(r.as_ref()))
        .collect();
    endpoints.sort();
    endpoints.dedup();
    endpoints
}

// Test modules - only compiled during testing
#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;
