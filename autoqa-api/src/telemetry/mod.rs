//! AutoQA Telemetry - Structured Logging
//!
//! JSON logs through `tracing-subscriber`, plus a per-request span.

pub mod middleware;
pub mod tracer;

pub use middleware::request_logging_middleware;
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
