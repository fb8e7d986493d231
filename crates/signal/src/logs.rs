//! Log signal containers

use crate::attrs::Attributes;
use crate::SERVICE_NAME_ATTR;

/// A single log record
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Stream this record belongs to.
    ///
    /// The stream identifier is the log analog of a trace id: records of
    /// one stream must land on one backend for downstream stateful
    /// processing (pattern mining, dedup) to see the whole stream.
    pub stream_id: String,
    /// Record body
    pub body: String,
    /// Record attributes
    pub attributes: Attributes,
}

impl LogRecord {
    /// Create a record with no attributes
    pub fn new(stream_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            body: body.into(),
            attributes: Attributes::new(),
        }
    }
}

/// Log records emitted by one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLogs {
    /// Resource attributes (service name lives here)
    pub resource: Attributes,
    /// Records under this resource
    pub records: Vec<LogRecord>,
}

/// A batch of log data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Logs {
    pub resource_logs: Vec<ResourceLogs>,
}

impl Logs {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all resources
    pub fn record_count(&self) -> usize {
        self.resource_logs.iter().map(|rl| rl.records.len()).sum()
    }

    /// Whether the batch carries no records
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// The stream id of the first record, if any.
    ///
    /// After `split_logs` every batch holds exactly one stream, so this
    /// is the batch's routing identity.
    pub fn first_stream_id(&self) -> Option<&str> {
        self.resource_logs
            .iter()
            .flat_map(|rl| rl.records.iter())
            .map(|r| r.stream_id.as_str())
            .next()
    }

    /// The `service.name` attribute of the first resource, if present
    pub fn service_name(&self) -> Option<&str> {
        self.resource_logs
            .first()
            .and_then(|rl| rl.resource.get(SERVICE_NAME_ATTR))
            .and_then(|v| v.as_str())
    }
}
