//! Trace signal containers

use std::fmt;

use crate::attrs::Attributes;
use crate::SERVICE_NAME_ATTR;

/// A 16-byte trace identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// Create a trace id from raw bytes
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw 16 bytes, as fed to the hash ring
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// The all-zero trace id (invalid per the OTLP data model)
    pub const fn zero() -> Self {
        Self([0; 16])
    }

    /// Whether this is the all-zero id
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl From<[u8; 16]> for TraceId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A single span
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Trace this span belongs to
    pub trace_id: TraceId,
    /// Operation name
    pub name: String,
    /// Span attributes
    pub attributes: Attributes,
}

impl Span {
    /// Create a span with no attributes
    pub fn new(trace_id: TraceId, name: impl Into<String>) -> Self {
        Self {
            trace_id,
            name: name.into(),
            attributes: Attributes::new(),
        }
    }
}

/// Spans emitted by one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSpans {
    /// Resource attributes (service name lives here)
    pub resource: Attributes,
    /// Spans under this resource
    pub spans: Vec<Span>,
}

/// A batch of trace data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traces {
    pub resource_spans: Vec<ResourceSpans>,
}

impl Traces {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of spans across all resources
    pub fn span_count(&self) -> usize {
        self.resource_spans.iter().map(|rs| rs.spans.len()).sum()
    }

    /// Whether the batch carries no spans
    pub fn is_empty(&self) -> bool {
        self.span_count() == 0
    }

    /// The trace id of the first span, if any.
    ///
    /// After `split_traces` every batch holds exactly one trace, so this
    /// is the batch's routing identity.
    pub fn first_trace_id(&self) -> Option<TraceId> {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.spans.iter())
            .map(|s| s.trace_id)
            .next()
    }

    /// The `service.name` attribute of the first resource, if present
    pub fn service_name(&self) -> Option<&str> {
        self.resource_spans
            .first()
            .and_then(|rs| rs.resource.get(SERVICE_NAME_ATTR))
            .and_then(|v| v.as_str())
    }
}
