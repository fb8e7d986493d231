//! Logs router - fan log streams out to their owning backends
//!
//! Splits an incoming batch into one sub-batch per log stream, so every
//! record of a stream lands on the same backend over time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use steer_ring::Endpoint;
use steer_signal::{merge_logs, split_logs, Logs};

use crate::balancer::LoadBalancer;
use crate::error::{AggregateError, BalancerError};
use crate::exporter::{Host, InflightGuard, WrappedExporter};
use crate::key::{log_routing_id, RoutingKey};

/// Router for log batches
pub struct LogsRouter {
    balancer: Arc<LoadBalancer>,
    routing_key: RoutingKey,
}

impl LogsRouter {
    /// The router regroups data but never mutates it in place.
    pub const MUTATES_DATA: bool = false;

    /// Create a logs router.
    ///
    /// `routing_key` accepts `streamID` (default) or `service`.
    pub fn new(
        balancer: Arc<LoadBalancer>,
        routing_key: Option<&str>,
    ) -> Result<Self, BalancerError> {
        Ok(Self {
            balancer,
            routing_key: RoutingKey::for_logs(routing_key)?,
        })
    }

    /// Start the underlying dispatcher (and its resolver)
    pub async fn start(&self, host: Host) -> Result<(), BalancerError> {
        self.balancer.start(host).await
    }

    /// Shut the underlying dispatcher down
    pub async fn shutdown(&self) -> Result<(), BalancerError> {
        self.balancer.shutdown().await
    }

    /// Route one log batch.
    ///
    /// Per-stream lookup or consume failures land in the aggregate
    /// error; owners that succeed are unaffected (partial success).
    pub async fn consume_logs(&self, logs: Logs) -> Result<(), AggregateError> {
        if logs.is_empty() {
            return Ok(());
        }

        let mut errors = AggregateError::new();
        let mut owners: Vec<OwnerBatch> = Vec::new();
        let mut owner_index: HashMap<Endpoint, usize> = HashMap::new();

        for batch in split_logs(logs) {
            let key = match log_routing_id(&batch, self.routing_key) {
                Ok(key) => key,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };

            let (exporter, endpoint) = match self.balancer.exporter_for(&key).await {
                Ok(found) => found,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };

            match owner_index.get(&endpoint) {
                Some(&i) => merge_logs(&mut owners[i].batch, batch),
                None => {
                    let guard = match exporter.acquire() {
                        Ok(guard) => guard,
                        Err(error) => {
                            errors.push(error);
                            continue;
                        }
                    };
                    owner_index.insert(endpoint.clone(), owners.len());
                    owners.push(OwnerBatch {
                        exporter,
                        endpoint,
                        guard,
                        batch,
                    });
                }
            }
        }

        for owner in owners {
            let started = Instant::now();
            let result = owner.exporter.consume_logs(owner.batch).await;
            drop(owner.guard);
            self.balancer
                .metrics()
                .record(&owner.endpoint, result.is_ok(), started.elapsed());
            if let Err(error) = result {
                errors.push(error.into());
            }
        }

        errors.into_result()
    }
}

struct OwnerBatch {
    exporter: Arc<WrappedExporter>,
    endpoint: Endpoint,
    guard: InflightGuard,
    batch: Logs,
}
