//! Steer Balancer - Consistent-hashing dispatch for telemetry signals
//!
//! Routes each signal element - a batch of spans, metric datapoints, or
//! log records - to exactly one of a dynamically changing set of backend
//! endpoints, so that elements sharing a routing key land on the same
//! backend over time. Downstream stateful processors (tail-based
//! sampling, stream-scoped dedup) stay correct while the fleet scales.
//!
//! # Architecture
//!
//! ```text
//! [Resolver] --endpoint set--> [LoadBalancer] --owns--> [WrappedExporter per endpoint]
//!                                    ^
//!                 exporter_for(key)  |
//! [TraceRouter / MetricsRouter / LogsRouter] --merged sub-batches--> backends
//! ```
//!
//! The core performs no retries, no buffering, and no acknowledgement;
//! a batch in flight during a membership change may land on the old
//! owner (acknowledged data-loss window during rolling updates).

mod balancer;
mod error;
mod exporter;
mod key;
mod log;
mod metric;
mod metrics;
mod trace;

pub use balancer::LoadBalancer;
pub use error::{AggregateError, BalancerError, ExporterError};
pub use exporter::{ComponentFactory, Exporter, Host, InflightGuard, WrappedExporter};
pub use key::RoutingKey;
pub use log::LogsRouter;
pub use metric::MetricsRouter;
pub use metrics::{BalancerMetrics, BalancerMetricsHandle};
pub use trace::TraceRouter;

// Test modules - only compiled during testing
#[cfg(test)]
mod testutil;
