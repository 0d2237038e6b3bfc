//! Compilation metrics.
//!
//! # Metrics
//! - `edge_routes_compiled_total` (counter): routes compiled, by kind
//! - `edge_pipelines_compiled_total` (counter): pipelines compiled, by event type
//! - `edge_handlers_compiled_total` (counter): handler instances compiled, by handler
//! - `edge_compile_errors_total` (counter): failed compilations, by stage
//!
//! # Design Decisions
//! - No exporter is installed here; the embedding process owns the recorder
//! - Without a recorder every call is a no-op

use metrics::counter;

use crate::rewrite::EventType;

pub fn record_route_compiled(kind: &str) {
    counter!("edge_routes_compiled_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_pipeline_compiled(event_type: EventType) {
    counter!("edge_pipelines_compiled_total", "event_type" => event_type.as_str()).increment(1);
}

pub fn record_handler_compiled(handler: &str) {
    counter!("edge_handlers_compiled_total", "handler" => handler.to_string()).increment(1);
}

/// `stage` is one of `config`, `routes`, `pipeline`, `deploy`.
pub fn record_compile_error(stage: &'static str) {
    counter!("edge_compile_errors_total", "stage" => stage).increment(1);
}
