//! Canonical backend endpoints

use std::fmt;

/// Port assumed when an endpoint omits one (the OTLP gRPC default).
pub const DEFAULT_PORT: u16 = 4317;

/// A canonical `host:port` backend address.
///
/// Construction appends `:4317` when the raw value carries no port, so
/// two spellings of the same backend compare equal everywhere downstream:
/// in the ring, in the exporter map, and in metrics tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(String);

impl Endpoint {
    /// Canonicalize a raw `host[:port]` string
    pub fn canonical(raw: &str) -> Self {
        if raw.contains(':') {
            Self(raw.to_string())
        } else {
            Self(format!("{raw}:{DEFAULT_PORT}"))
        }
    }

    /// The canonical `host:port` string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(raw: &str) -> Self {
        Self::canonical(raw)
    }
}
