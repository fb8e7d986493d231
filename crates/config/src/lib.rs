//! Steer Config - Configuration surface for the dispatcher
//!
//! Declarative TOML configuration: which resolver produces the backend
//! set and which routing key each signal uses. Validation is strict and
//! happens before anything starts - a config that passes `validate()`
//! constructs without surprises.
//!
//! # Example
//!
//! ```toml
//! routing_key = "traceID"
//!
//! [resolver.dns]
//! hostname = "backends.example.svc"
//! interval = "5s"
//! timeout = "1s"
//! ```

mod error;
mod resolver;

pub use error::{ConfigError, Result};
pub use resolver::{
    DnsResolverConfig, K8sResolverConfig, ResolverConfig, StaticResolverConfig,
};

use serde::Deserialize;
use steer_balancer::RoutingKey;

/// Top-level dispatcher configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How batches derive their routing key (signal-specific default
    /// when unset)
    pub routing_key: Option<String>,

    /// Backend membership source
    pub resolver: ResolverConfig,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Parse and validate in one step
    pub fn load(raw: &str) -> Result<Self> {
        let config = Self::from_toml(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate resolver selection and the routing key.
    ///
    /// The routing key is checked against [`RoutingKey`]; the per-signal
    /// compatibility check (and defaulting) happens at router
    /// construction.
    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;

        if let Some(ref key) = self.routing_key
            && !key.is_empty()
            && RoutingKey::parse(key).is_none()
        {
            return Err(ConfigError::invalid_routing_key(key));
        }

        Ok(())
    }
}
