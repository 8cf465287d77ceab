//! Operational endpoints served by the gateway itself. They take
//! precedence over the route table and never require a credential.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::state::GatewayState;

/// Build the operational router.
pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
}

/// Liveness probe. Answers 200 while the process can serve requests.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. The route table, verifier and client are all built
/// before the listener binds, so a serving gateway is ready. Upstream
/// health is not probed.
async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus text exposition of the gateway registry.
async fn prometheus_metrics(State(state): State<GatewayState>) -> Response {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
