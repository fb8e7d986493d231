//! Balancer error types

use std::fmt;

use steer_resolver::ResolveError;
use thiserror::Error;

/// Errors from the backend exporter collaborator
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Factory could not build an exporter for a resolved endpoint
    #[error("failed to create exporter for endpoint \"{endpoint}\": {message}")]
    Factory { endpoint: String, message: String },

    /// Exporter start failed
    #[error("exporter start failed: {0}")]
    Start(String),

    /// Exporter shutdown failed
    #[error("exporter shutdown failed: {0}")]
    Shutdown(String),

    /// Downstream consume call failed
    #[error("backend consume failed: {0}")]
    Consume(String),
}

/// Errors from dispatch and routing
#[derive(Debug, Error)]
pub enum BalancerError {
    /// No membership event has populated the ring yet, or the adopted
    /// membership is empty
    #[error("load balancer has no backends to dispatch to")]
    NotReady,

    /// The ring owns the endpoint but no exporter is registered for it
    /// (transient disagreement window after a failed exporter start)
    #[error("couldn't find the exporter for the endpoint \"{endpoint}\"")]
    ExporterNotFound { endpoint: String },

    /// The owning exporter is draining and no longer accepts batches
    #[error("exporter for endpoint \"{endpoint}\" is shutting down")]
    Draining { endpoint: String },

    /// Routing by service requires the `service.name` resource attribute
    #[error("unable to get service name")]
    MissingServiceName,

    /// A trace sub-batch carried no spans to derive a key from
    #[error("empty resource spans")]
    EmptyResourceSpans,

    /// A log sub-batch carried no records to derive a key from
    #[error("empty resource logs")]
    EmptyResourceLogs,

    /// The configured routing key is not valid for this signal type
    #[error("unsupported routing_key \"{key}\" for {signal}")]
    UnsupportedRoutingKey { key: String, signal: &'static str },

    /// Resolver failure surfaced through start/shutdown
    #[error(transparent)]
    Resolver(#[from] ResolveError),

    /// Backend exporter failure
    #[error(transparent)]
    Exporter(#[from] ExporterError),
}

/// Aggregate of per-owner outcomes from routing one batch.
///
/// Routing fans one input batch out to several owners and never
/// short-circuits: every lookup and consume outcome is collected, so
/// partial success is visible to the upstream retry decision.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<BalancerError>,
}

impl AggregateError {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, error: BalancerError) {
        self.errors.push(error);
    }

    /// The collected per-owner errors
    pub fn errors(&self) -> &[BalancerError] {
        &self.errors
    }

    /// `Ok(())` when nothing failed, otherwise self
    pub(crate) fn into_result(self) -> Result<(), AggregateError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_joins_messages() {
        let mut aggregate = AggregateError::new();
        aggregate.push(BalancerError::MissingServiceName);
        aggregate.push(BalancerError::ExporterNotFound {
            endpoint: "c:4317".into(),
        });

        let rendered = aggregate.to_string();
        assert!(rendered.contains("unable to get service name"));
        assert!(rendered.contains("c:4317"));
        assert!(rendered.contains("; "));
    }

    #[test]
    fn test_empty_aggregate_is_ok() {
        assert!(AggregateError::new().into_result().is_ok());
    }
}
