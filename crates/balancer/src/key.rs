//! Routing key categories and extraction

use steer_signal::{Attributes, Logs, Metric, Traces};

use crate::error::BalancerError;

/// How a signal batch derives the byte string that picks its backend.
///
/// Selected once at configuration time per signal type; each signal
/// supports a subset of the categories and has its own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKey {
    /// The 16-byte trace id (traces)
    TraceId,
    /// The `service.name` resource attribute (any signal)
    Service,
    /// Sorted resource-attribute fingerprint plus metric name (metrics)
    Resource,
    /// The metric name alone (metrics)
    Metric,
    /// The log record's stream identifier (logs)
    StreamId,
}

impl RoutingKey {
    /// Parse a configuration string
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "traceID" => Some(Self::TraceId),
            "service" => Some(Self::Service),
            "resource" => Some(Self::Resource),
            "metric" => Some(Self::Metric),
            "streamID" => Some(Self::StreamId),
            _ => None,
        }
    }

    /// The configuration spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TraceId => "traceID",
            Self::Service => "service",
            Self::Resource => "resource",
            Self::Metric => "metric",
            Self::StreamId => "streamID",
        }
    }

    /// Resolve the key for the trace router: default `traceID`
    pub fn for_traces(configured: Option<&str>) -> Result<Self, BalancerError> {
        resolve(configured, Self::TraceId, &[Self::TraceId, Self::Service], "traces")
    }

    /// Resolve the key for the metrics router: default `service`
    pub fn for_metrics(configured: Option<&str>) -> Result<Self, BalancerError> {
        resolve(
            configured,
            Self::Service,
            &[Self::Service, Self::Resource, Self::Metric],
            "metrics",
        )
    }

    /// Resolve the key for the logs router: default `streamID`
    pub fn for_logs(configured: Option<&str>) -> Result<Self, BalancerError> {
        resolve(configured, Self::StreamId, &[Self::StreamId, Self::Service], "logs")
    }
}

fn resolve(
    configured: Option<&str>,
    default: RoutingKey,
    allowed: &[RoutingKey],
    signal: &'static str,
) -> Result<RoutingKey, BalancerError> {
    let raw = match configured {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };

    match RoutingKey::parse(raw) {
        Some(key) if allowed.contains(&key) => Ok(key),
        _ => Err(BalancerError::UnsupportedRoutingKey {
            key: raw.to_string(),
            signal,
        }),
    }
}

/// Routing key of one single-trace batch (the output of `split_traces`)
pub(crate) fn trace_routing_id(batch: &Traces, key: RoutingKey) -> Result<Vec<u8>, BalancerError> {
    match key {
        RoutingKey::Service => service_routing_id(batch.service_name()),
        _ => {
            let trace_id = batch
                .first_trace_id()
                .ok_or(BalancerError::EmptyResourceSpans)?;
            Ok(trace_id.as_bytes().to_vec())
        }
    }
}

/// Routing key of one single-stream batch (the output of `split_logs`)
pub(crate) fn log_routing_id(batch: &Logs, key: RoutingKey) -> Result<Vec<u8>, BalancerError> {
    match key {
        RoutingKey::Service => service_routing_id(batch.service_name()),
        _ => {
            let stream_id = batch
                .first_stream_id()
                .ok_or(BalancerError::EmptyResourceLogs)?;
            Ok(stream_id.as_bytes().to_vec())
        }
    }
}

/// Routing key of one metric under `resource` or `metric` routing
pub(crate) fn metric_routing_id(resource: &Attributes, metric: &Metric, key: RoutingKey) -> Vec<u8> {
    match key {
        RoutingKey::Resource => {
            let mut id = resource.fingerprint();
            id.push_str(&metric.name);
            id.into_bytes()
        }
        _ => metric.name.clone().into_bytes(),
    }
}

pub(crate) fn service_routing_id(service: Option<&str>) -> Result<Vec<u8>, BalancerError> {
    service
        .map(|s| s.as_bytes().to_vec())
        .ok_or(BalancerError::MissingServiceName)
}
