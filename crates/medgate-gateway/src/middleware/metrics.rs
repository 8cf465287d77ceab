//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency) are recorded in middleware.
//! Authentication and upstream failures are recorded by the forwarding
//! handler, and by the proxy for failures while streaming a response body,
//! so dependency outages stay distinguishable from client errors.
//!
//! Route labels are rule names, never raw paths, which keeps label
//! cardinality bounded by the size of the route table.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Route label for requests no rule matched (and for operational endpoints).
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Response extension naming the rule that handled the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLabel(pub String);

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct GatewayMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    auth_failures_total: IntCounterVec,
    upstream_failures_total: IntCounterVec,
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics")
            .field("requests", &self.requests())
            .field("auth_failures", &self.auth_failures())
            .field("upstream_failures", &self.upstream_failures())
            .finish()
    }
}

impl GatewayMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("medgate_http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "medgate_http_request_duration_seconds",
                "HTTP request duration in seconds, including the upstream call",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method", "route"],
        )?;

        let auth_failures_total = IntCounterVec::new(
            Opts::new(
                "medgate_auth_failures_total",
                "Requests rejected on routes that require authentication",
            ),
            &["reason"],
        )?;

        let upstream_failures_total = IntCounterVec::new(
            Opts::new(
                "medgate_upstream_failures_total",
                "Upstream calls that failed or stalled, before or while relaying the response",
            ),
            &["upstream", "kind"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(upstream_failures_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                auth_failures_total,
                upstream_failures_total,
            }),
        })
    }

    /// Return current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// Return current total authentication failure count.
    pub fn auth_failures(&self) -> u64 {
        sum_counters(&self.inner.auth_failures_total)
    }

    /// Return current total upstream failure count.
    pub fn upstream_failures(&self) -> u64 {
        sum_counters(&self.inner.upstream_failures_total)
    }

    fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, route, &status])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    /// Count a request rejected for a missing or invalid credential.
    pub fn record_auth_failure(&self, reason: &str) {
        self.inner
            .auth_failures_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Count a failed upstream call.
    pub fn record_upstream_failure(&self, upstream: &str, kind: &str) {
        self.inner
            .upstream_failures_total
            .with_label_values(&[upstream, kind])
            .inc();
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counters(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Method label. Extension methods collapse to `OTHER` so clients cannot
/// mint label values.
fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::TRACE => "TRACE",
        Method::CONNECT => "CONNECT",
        _ => "OTHER",
    }
}

/// Middleware that records HTTP request metrics via Prometheus.
///
/// Expects [`GatewayMetrics`] in the request extensions and reads the
/// [`RouteLabel`] the handler left on the response.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<GatewayMetrics>().cloned();
    let method = method_label(request.method());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let route = response
            .extensions()
            .get::<RouteLabel>()
            .map(|label| label.0.as_str())
            .unwrap_or(UNMATCHED_ROUTE);
        m.record_request(
            method,
            route,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}
