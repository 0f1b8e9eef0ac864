use tracing::{Level, Span, field};

use super::TraceId;

/// Root span for one monitoring cycle or tracking job.
pub fn cycle_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::span!(
        Level::INFO,
        "cycle",
        name = %name,
        trace_id = %trace_id,
        url = field::Empty,
        retailer = field::Empty
    )
}

/// Child span (inherits the trace id from the enclosing cycle span).
pub fn child_span(name: &'static str) -> Span {
    tracing::span!(
        Level::INFO,
        "child",
        name = %name,
        url = field::Empty,
        retailer = field::Empty
    )
}
