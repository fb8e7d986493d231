//! Trace router - fan traces out to their owning backends
//!
//! Splits an incoming batch into one sub-batch per trace, asks the
//! dispatcher for each sub-batch's owner, merges sub-batches per owner,
//! and invokes every owner exactly once. Spans of one trace always land
//! on one backend, so downstream stateful processing (tail sampling)
//! sees whole traces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use steer_ring::Endpoint;
use steer_signal::{merge_traces, split_traces, Traces};

use crate::balancer::LoadBalancer;
use crate::error::{AggregateError, BalancerError};
use crate::exporter::{Host, InflightGuard, WrappedExporter};
use crate::key::{trace_routing_id, RoutingKey};

/// Router for trace batches
pub struct TraceRouter {
    balancer: Arc<LoadBalancer>,
    routing_key: RoutingKey,
}

impl TraceRouter {
    /// The router regroups data but never mutates it in place.
    pub const MUTATES_DATA: bool = false;

    /// Create a trace router.
    ///
    /// `routing_key` accepts `traceID` (default) or `service`.
    pub fn new(
        balancer: Arc<LoadBalancer>,
        routing_key: Option<&str>,
    ) -> Result<Self, BalancerError> {
        Ok(Self {
            balancer,
            routing_key: RoutingKey::for_traces(routing_key)?,
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

    /// Route one trace batch.
    ///
    /// Per-trace lookup or consume failures land in the aggregate error;
    /// owners that succeed are unaffected (partial success).
    pub async fn consume_traces(&self, traces: Traces) -> Result<(), AggregateError> {
        if traces.is_empty() {
            return Ok(());
        }

        let mut errors = AggregateError::new();
        let mut owners: Vec<OwnerBatch> = Vec::new();
        let mut owner_index: HashMap<Endpoint, usize> = HashMap::new();

        for batch in split_traces(traces) {
            let key = match trace_routing_id(&batch, self.routing_key) {
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
                Some(&i) => merge_traces(&mut owners[i].batch, batch),
                None => {
                    // One in-flight reference per owner, taken before the
                    // first sub-batch is appended.
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
            let result = owner.exporter.consume_traces(owner.batch).await;
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
    batch: Traces,
}
