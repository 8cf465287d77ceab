//! # medgate-gateway — Authenticating Reverse Proxy
//!
//! Single entry point for the medgate record-keeping services. The gateway
//! authenticates a caller once, routes the request by path to the owning
//! backend, and hands the caller's identity to that backend in trusted
//! headers it alone may write.
//!
//! ## API Surface
//!
//! | Path                  | Module                    | Auth                |
//! |-----------------------|---------------------------|---------------------|
//! | `/health/liveness`    | [`routes::ops`]           | none                |
//! | `/health/readiness`   | [`routes::ops`]           | none                |
//! | `/metrics`            | [`routes::ops`]           | none                |
//! | everything else       | [`routes::forward`]       | per route rule      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! SetRequestId → TraceLayer → PropagateRequestId → MetricsMiddleware → forward
//! ```
//!
//! ## Modules
//!
//! - [`routing`]: route rules, the ordered route table, path rewriting.
//! - [`route_file`]: YAML route tables, including the built-in one.
//! - [`auth`]: bearer verification and per-route auth policy.
//! - [`propagate`]: trusted identity header injection.
//! - [`proxy`]: streaming single-attempt upstream forwarding.
//! - [`config`]: environment configuration, read once at startup.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod propagate;
pub mod proxy;
pub mod route_file;
pub mod routes;
pub mod routing;
pub mod state;

use axum::middleware::from_fn;
use axum::{Extension, Router};

use crate::middleware::metrics::metrics_middleware;
use crate::middleware::tracing_layer;

pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;
pub use state::GatewayState;

/// Assemble the full application router.
///
/// Operational endpoints are matched first; every other request falls
/// through to the forwarding handler and the route table.
pub fn app(state: GatewayState) -> Router {
    let gateway = routes::forward::router()
        .layer(from_fn(metrics_middleware))
        .layer(Extension(state.metrics.clone()));

    Router::new()
        .merge(routes::ops::router())
        .merge(gateway)
        .layer(tracing_layer::propagate_request_id())
        .layer(tracing_layer::layer())
        .layer(tracing_layer::set_request_id())
        .with_state(state)
}
