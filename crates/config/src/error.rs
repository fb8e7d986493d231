//! Configuration error types

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when parsing or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// No resolver block is configured
    #[error("no resolvers specified for the exporter")]
    NoResolver,

    /// More than one resolver block is configured
    #[error("only one resolver should be specified")]
    MultipleResolvers,

    /// `routing_key` is not one of the recognized categories
    #[error("unsupported routing_key: \"{key}\"")]
    InvalidRoutingKey {
        /// The rejected value
        key: String,
    },

    /// Validation error - required field missing
    #[error("resolver '{resolver}' is missing required field '{field}'")]
    MissingField {
        /// Resolver variant name
        resolver: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("resolver '{resolver}' has invalid {field}: {message}")]
    InvalidValue {
        /// Resolver variant name
        resolver: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an InvalidRoutingKey error
    pub fn invalid_routing_key(key: impl Into<String>) -> Self {
        Self::InvalidRoutingKey { key: key.into() }
    }

    /// Create a MissingField error
    pub fn missing_field(resolver: &'static str, field: &'static str) -> Self {
        Self::MissingField { resolver, field }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        resolver: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            resolver,
            field,
            message: message.into(),
        }
    }
}
