//! Metrics router - fan metrics out to their owning backends
//!
//! Metrics have no batch-per-signal split: the router iterates resource
//! entries directly. Under `service` routing the unit is one resource
//! entry; under `resource` and `metric` routing it is one metric, with
//! the resource context cloned into each unit, so different metrics of
//! one resource can land on different backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use steer_ring::Endpoint;
use steer_signal::{merge_metrics, Metrics, ResourceMetrics, SERVICE_NAME_ATTR};

use crate::balancer::LoadBalancer;
use crate::error::{AggregateError, BalancerError};
use crate::exporter::{Host, InflightGuard, WrappedExporter};
use crate::key::{metric_routing_id, service_routing_id, RoutingKey};

/// Router for metric batches
pub struct MetricsRouter {
    balancer: Arc<LoadBalancer>,
    routing_key: RoutingKey,
}

impl MetricsRouter {
    /// The router regroups data but never mutates it in place.
    pub const MUTATES_DATA: bool = false;

    /// Create a metrics router.
    ///
    /// `routing_key` accepts `service` (default), `resource`, or
    /// `metric`.
    pub fn new(
        balancer: Arc<LoadBalancer>,
        routing_key: Option<&str>,
    ) -> Result<Self, BalancerError> {
        Ok(Self {
            balancer,
            routing_key: RoutingKey::for_metrics(routing_key)?,
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

    /// Route one metric batch.
    ///
    /// Per-unit lookup or consume failures land in the aggregate error;
    /// owners that succeed are unaffected (partial success).
    pub async fn consume_metrics(&self, metrics: Metrics) -> Result<(), AggregateError> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut errors = AggregateError::new();
        let mut owners: Vec<OwnerBatch> = Vec::new();
        let mut owner_index: HashMap<Endpoint, usize> = HashMap::new();

        for (key, unit) in self.routing_units(metrics, &mut errors) {
            let (exporter, endpoint) = match self.balancer.exporter_for(&key).await {
                Ok(found) => found,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };

            match owner_index.get(&endpoint) {
                Some(&i) => merge_metrics(&mut owners[i].batch, unit),
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
                        batch: unit,
                    });
                }
            }
        }

        for owner in owners {
            let started = Instant::now();
            let result = owner.exporter.consume_metrics(owner.batch).await;
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

    /// Decompose a batch into `(routing key, unit)` pairs for the
    /// configured key
    fn routing_units(
        &self,
        metrics: Metrics,
        errors: &mut AggregateError,
    ) -> Vec<(Vec<u8>, Metrics)> {
        let mut units = Vec::new();

        match self.routing_key {
            RoutingKey::Service => {
                for rm in metrics.resource_metrics {
                    if rm.metrics.is_empty() {
                        continue;
                    }
                    let service = rm
                        .resource
                        .get(SERVICE_NAME_ATTR)
                        .and_then(|value| value.as_str());
                    match service_routing_id(service) {
                        Ok(key) => units.push((
                            key,
                            Metrics {
                                resource_metrics: vec![rm],
                            },
                        )),
                        Err(error) => errors.push(error),
                    }
                }
            }
            _ => {
                for rm in metrics.resource_metrics {
                    let resource = rm.resource;
                    for metric in rm.metrics {
                        let key = metric_routing_id(&resource, &metric, self.routing_key);
                        units.push((
                            key,
                            Metrics {
                                resource_metrics: vec![ResourceMetrics {
                                    resource: resource.clone(),
                                    metrics: vec![metric],
                                }],
                            },
                        ));
                    }
                }
            }
        }

        units
    }
}

struct OwnerBatch {
    exporter: Arc<WrappedExporter>,
    endpoint: Endpoint,
    guard: InflightGuard,
    batch: Metrics,
}
