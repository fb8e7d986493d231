//! Resolver configuration blocks
//!
//! Exactly one resolver variant must be configured:
//!
//! ```toml
//! [resolver.static]
//! hostnames = ["backend-1:4317", "backend-2"]
//! ```
//!
//! ```toml
//! [resolver.dns]
//! hostname = "backends.example.svc"
//! port = 4317
//! interval = "5s"
//! timeout = "1s"
//! ```
//!
//! ```toml
//! [resolver.k8s]
//! service = "otelcol.observability"
//! ports = [4317]
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Resolver selection - exactly one variant must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Fixed endpoint list
    #[serde(rename = "static")]
    pub static_: Option<StaticResolverConfig>,

    /// Periodic DNS lookup
    pub dns: Option<DnsResolverConfig>,

    /// Kubernetes service endpoints watch
    pub k8s: Option<K8sResolverConfig>,
}

impl ResolverConfig {
    /// Validate that exactly one well-formed variant is configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        let configured = [
            self.static_.is_some(),
            self.dns.is_some(),
            self.k8s.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        match configured {
            0 => return Err(ConfigError::NoResolver),
            1 => {}
            _ => return Err(ConfigError::MultipleResolvers),
        }

        if let Some(ref static_) = self.static_ {
            static_.validate()?;
        }
        if let Some(ref dns) = self.dns {
            dns.validate()?;
        }
        if let Some(ref k8s) = self.k8s {
            k8s.validate()?;
        }
        Ok(())
    }
}

/// Static resolver configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StaticResolverConfig {
    /// Backend endpoints (`host[:port]`)
    pub hostnames: Vec<String>,
}

impl StaticResolverConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hostnames.is_empty() {
            return Err(ConfigError::missing_field("static", "hostnames"));
        }
        Ok(())
    }
}

/// DNS resolver configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DnsResolverConfig {
    /// Hostname to resolve
    pub hostname: String,

    /// Port paired with every resolved address (default 4317)
    pub port: Option<u16>,

    /// Poll interval (default 5s)
    #[serde(with = "humantime_serde")]
    pub interval: Option<Duration>,

    /// Per-resolve deadline (default 1s)
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl DnsResolverConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.is_empty() {
            return Err(ConfigError::missing_field("dns", "hostname"));
        }
        if let Some(interval) = self.interval
            && interval.is_zero()
        {
            return Err(ConfigError::invalid_value(
                "dns",
                "interval",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Kubernetes service resolver configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct K8sResolverConfig {
    /// Service name, optionally namespaced (`svc[.namespace]`)
    pub service: String,

    /// Ports emitted per Ready address
    pub ports: Vec<u16>,
}

impl K8sResolverConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::missing_field("k8s", "service"));
        }
        if self.ports.is_empty() {
            return Err(ConfigError::missing_field("k8s", "ports"));
        }
        Ok(())
    }
}
