//! Resolver error types

use std::time::Duration;

use thiserror::Error;

/// Errors from resolver construction and resolution attempts
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Static resolver configured with an empty hostname list
    #[error("no endpoints specified for the static resolver")]
    NoEndpoints,

    /// DNS resolver configured without a hostname
    #[error("no hostname specified for the DNS resolver")]
    NoHostname,

    /// DNS resolver configured with a non-positive interval
    #[error("DNS resolver interval must be positive")]
    InvalidInterval,

    /// Forward lookup failed
    #[error("failed to resolve '{hostname}': {source}")]
    Lookup {
        hostname: String,
        #[source]
        source: std::io::Error,
    },

    /// Forward lookup exceeded its deadline
    #[error("resolving '{hostname}' timed out after {timeout:?}")]
    LookupTimeout { hostname: String, timeout: Duration },

    /// K8s resolver configured without a service name
    #[error("no service specified for the k8s resolver")]
    NoService,

    /// K8s resolver configured with an empty port list
    #[error("no ports specified for the k8s resolver")]
    NoPorts,

    /// Endpoints list/watch call against the API server failed
    #[error("endpoints watch for '{service}' failed: {message}")]
    Watch { service: String, message: String },
}

impl ResolveError {
    /// Create a Watch error
    pub fn watch(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Watch {
            service: service.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_names_hostname() {
        let err = ResolveError::Lookup {
            hostname: "backends.example".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"),
        };
        assert!(err.to_string().contains("backends.example"));
        assert!(err.to_string().contains("no such host"));
    }

    #[test]
    fn test_watch_error_names_service() {
        let err = ResolveError::watch("otelcol", "connection reset");
        assert!(err.to_string().contains("otelcol"));
        assert!(err.to_string().contains("connection reset"));
    }
}
