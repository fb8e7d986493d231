//! Per-signal split and per-destination merge
//!
//! Splitting turns one incoming batch into its minimal routable units:
//! one trace per batch for traces, one stream per batch for logs. Merging
//! is the inverse, used by the routers to build one outgoing batch per
//! destination. Metrics have no split here - the routers iterate
//! resource entries and metrics directly.

use std::collections::HashMap;

use crate::logs::{Logs, ResourceLogs};
use crate::metrics::Metrics;
use crate::traces::{ResourceSpans, TraceId, Traces};

/// Split a trace batch into one batch per trace id.
///
/// Resource attributes are cloned into every output batch that carries
/// spans of that resource. Span order is preserved within each trace, and
/// output batches appear in first-seen trace id order, so the result is
/// deterministic for a given input.
pub fn split_traces(traces: Traces) -> Vec<Traces> {
    let mut order: Vec<TraceId> = Vec::new();
    let mut by_trace: HashMap<TraceId, Traces> = HashMap::new();

    for rs in traces.resource_spans {
        for span in rs.spans {
            let entry = by_trace.entry(span.trace_id).or_insert_with(|| {
                order.push(span.trace_id);
                Traces::new()
            });

            // Reuse the last resource entry when consecutive spans share
            // a resource, otherwise open a new one.
            let reuse = entry
                .resource_spans
                .last()
                .is_some_and(|last| last.resource == rs.resource);
            if !reuse {
                entry.resource_spans.push(ResourceSpans {
                    resource: rs.resource.clone(),
                    spans: Vec::new(),
                });
            }
            if let Some(last) = entry.resource_spans.last_mut() {
                last.spans.push(span);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_trace.remove(&id))
        .collect()
}

/// Split a log batch into one batch per stream id.
///
/// Same contract as [`split_traces`]: resource context cloned per output,
/// record order preserved within a stream, first-seen stream order.
pub fn split_logs(logs: Logs) -> Vec<Logs> {
    let mut order: Vec<String> = Vec::new();
    let mut by_stream: HashMap<String, Logs> = HashMap::new();

    for rl in logs.resource_logs {
        for record in rl.records {
            let entry = by_stream.entry(record.stream_id.clone()).or_insert_with(|| {
                order.push(record.stream_id.clone());
                Logs::new()
            });

            let reuse = entry
                .resource_logs
                .last()
                .is_some_and(|last| last.resource == rl.resource);
            if !reuse {
                entry.resource_logs.push(ResourceLogs {
                    resource: rl.resource.clone(),
                    records: Vec::new(),
                });
            }
            if let Some(last) = entry.resource_logs.last_mut() {
                last.records.push(record);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_stream.remove(&id))
        .collect()
}

/// Append all resource entries of `src` to `dst`
pub fn merge_traces(dst: &mut Traces, src: Traces) {
    dst.resource_spans.extend(src.resource_spans);
}

/// Append all resource entries of `src` to `dst`
pub fn merge_metrics(dst: &mut Metrics, src: Metrics) {
    dst.resource_metrics.extend(src.resource_metrics);
}

/// Append all resource entries of `src` to `dst`
pub fn merge_logs(dst: &mut Logs, src: Logs) {
    dst.resource_logs.extend(src.resource_logs);
}
