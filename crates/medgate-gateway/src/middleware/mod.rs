//! # Middleware Stack
//!
//! Tower middleware for the gateway:
//! - [`tracing_layer`]: request/response tracing and `x-request-id` correlation.
//! - [`metrics`]: Prometheus request, authentication and upstream metrics.

pub mod metrics;
pub mod tracing_layer;
