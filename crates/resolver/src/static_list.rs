//! Static resolver - a fixed hostname list

use std::sync::Arc;

use async_trait::async_trait;
use steer_ring::Endpoint;

use crate::notify::ChangeNotifier;
use crate::{canonical_set, ChangeCallback, ResolveError, Resolver};

/// Resolver over a fixed, configuration-supplied endpoint list.
///
/// Resolution happens once at [`start`](Resolver::start); the membership
/// never changes afterwards, so there is no background task and
/// `shutdown` has nothing to stop.
pub struct StaticResolver {
    endpoints: Vec<Endpoint>,
    notifier: Arc<ChangeNotifier>,
}

impl StaticResolver {
    /// Create a resolver from a hostname list.
    ///
    /// Fails with [`ResolveError::NoEndpoints`] when the list is empty.
    pub fn new<S: AsRef<str>>(hostnames: &[S]) -> Result<Self, ResolveError> {
        if hostnames.is_empty() {
            return Err(ResolveError::NoEndpoints);
        }

        Ok(Self {
            endpoints: canonical_set(hostnames),
            notifier: Arc::new(ChangeNotifier::new()),
        })
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    fn on_change(&self, callback: ChangeCallback) {
        self.notifier.set_callback(callback);
    }

    async fn start(&self) -> Result<(), ResolveError> {
        let endpoints = self.resolve().await?;
        tracing::debug!(backends = endpoints.len(), "static membership adopted");
        self.notifier.maybe_adopt(endpoints).await;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ResolveError> {
        Ok(())
    }

    async fn resolve(&self) -> Result<Vec<Endpoint>, ResolveError> {
        Ok(self.endpoints.clone())
    }
}
