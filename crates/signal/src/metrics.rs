//! Metric signal containers

use crate::attrs::Attributes;
use crate::SERVICE_NAME_ATTR;

/// A single named metric
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Metric name
    pub name: String,
    /// Datapoint attributes
    pub attributes: Attributes,
}

impl Metric {
    /// Create a metric with no attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }
}

/// Metrics emitted by one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMetrics {
    /// Resource attributes (service name lives here)
    pub resource: Attributes,
    /// Metrics under this resource
    pub metrics: Vec<Metric>,
}

/// A batch of metric data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl Metrics {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of metrics across all resources
    pub fn metric_count(&self) -> usize {
        self.resource_metrics.iter().map(|rm| rm.metrics.len()).sum()
    }

    /// Whether the batch carries no metrics
    pub fn is_empty(&self) -> bool {
        self.metric_count() == 0
    }

    /// The `service.name` attribute of the first resource, if present
    pub fn service_name(&self) -> Option<&str> {
        self.resource_metrics
            .first()
            .and_then(|rm| rm.resource.get(SERVICE_NAME_ATTR))
            .and_then(|v| v.as_str())
    }
}
