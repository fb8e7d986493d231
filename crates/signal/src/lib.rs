//! Steer Signal - Core telemetry types for the steer dispatcher
//!
//! This crate provides the signal containers that flow through the routers:
//! - `Traces` - spans grouped under a resource
//! - `Metrics` - datapoint-carrying metrics grouped under a resource
//! - `Logs` - log records grouped under a resource, identified by stream
//! - `split_traces` / `split_logs` - decompose a batch into its minimal
//!   routable units (one trace / one log stream per output batch)
//! - `merge_*` - recombine units into one batch per destination
//!
//! # Design Principles
//!
//! - **Plain containers**: no builders, no hidden invariants; routers read
//!   and regroup, they never mutate entries in place
//! - **Ordered attributes**: `Attributes` keeps keys sorted so fingerprint
//!   renderings are deterministic without an extra sort
//! - **Clone-cheap**: sub-batch extraction clones only what it carries

mod attrs;
mod logs;
mod metrics;
mod split;
mod traces;

pub use attrs::{AttrValue, Attributes};
pub use logs::{LogRecord, Logs, ResourceLogs};
pub use metrics::{Metric, Metrics, ResourceMetrics};
pub use split::{merge_logs, merge_metrics, merge_traces, split_logs, split_traces};
pub use traces::{ResourceSpans, Span, TraceId, Traces};

/// Resource attribute that names the emitting service.
pub const SERVICE_NAME_ATTR: &str = "service.name";
