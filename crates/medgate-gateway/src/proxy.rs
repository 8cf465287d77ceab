//! # Reverse Proxy
//!
//! Single-attempt, fail-fast forwarding of one request to one upstream.
//!
//! Request and response bodies are streamed: the inbound body is handed to
//! `reqwest` as a stream and the upstream body is handed back to Axum as a
//! stream, so neither side is buffered in memory. Dropping the future
//! returned by [`ReverseProxy::forward`] (client disconnect) or the relayed
//! response body aborts the upstream connection.
//!
//! The upstream timeout bounds the wait for response headers and then every
//! wait for the next body chunk. A body that stalls longer ends the relayed
//! stream with an error, so the client sees a truncated response rather than
//! a complete-looking one.
//!
//! ## Failure classes
//!
//! | Error                       | Cause                                         | Status |
//! |-----------------------------|-----------------------------------------------|--------|
//! | [`ProxyError::Construction`]| request cannot be built (programmer error)    | 500    |
//! | [`ProxyError::Unavailable`] | connect refused, DNS, reset, TLS              | 502    |
//! | [`ProxyError::Timeout`]     | no response headers within the upstream timeout | 502  |
//!
//! Once headers are relayed the status is fixed. `Unavailable` and `Timeout`
//! raised while streaming the body abort the response instead.

use std::pin::Pin;
use std::time::Duration;

use axum::body::{Body, Bytes, HttpBody};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use futures::stream::{self, Stream, StreamExt};
use thiserror::Error;
use url::Url;

use crate::middleware::metrics::GatewayMetrics;

/// Headers scoped to a single transport connection. Never relayed in
/// either direction.
const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Timeouts for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxySettings {
    /// Bound on the wait for upstream response headers, and on each wait
    /// for the next response body chunk.
    pub upstream_timeout: Duration,
    /// Bound on TCP (and TLS) connection establishment.
    pub connect_timeout: Duration,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Errors from forwarding a request.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The shared HTTP client could not be built.
    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The outbound request could not be constructed.
    #[error("cannot construct request to upstream {upstream}: {source}")]
    Construction {
        /// Upstream service name.
        upstream: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be delivered or the connection failed.
    #[error("upstream {upstream} unavailable: {source}")]
    Unavailable {
        /// Upstream service name.
        upstream: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The upstream did not answer, or stalled mid-body, for longer than the timeout.
    #[error("upstream {upstream} did not respond within {after:?}")]
    Timeout {
        /// Upstream service name.
        upstream: String,
        /// The timeout that elapsed.
        after: Duration,
    },
}

impl ProxyError {
    /// Metric label for this failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Construction { .. } => "construction",
            Self::Unavailable { .. } => "unavailable",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Upstream service name, when the error concerns one.
    pub fn upstream(&self) -> Option<&str> {
        match self {
            Self::Client(_) => None,
            Self::Construction { upstream, .. }
            | Self::Unavailable { upstream, .. }
            | Self::Timeout { upstream, .. } => Some(upstream),
        }
    }
}

/// A request ready to be sent upstream. Headers are final: hop-by-hop
/// headers removed and trusted identity headers already attached.
#[derive(Debug)]
pub struct OutboundRequest {
    /// Upstream service name (logs and metrics).
    pub upstream: String,
    /// Original method.
    pub method: Method,
    /// Upstream URL including the rewritten path and original query.
    pub url: Url,
    /// Outbound headers.
    pub headers: HeaderMap,
    /// Original body, streamed.
    pub body: Body,
}

/// Shared forwarding client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    client: reqwest::Client,
    upstream_timeout: Duration,
    metrics: Option<GatewayMetrics>,
}

impl ReverseProxy {
    /// Build the proxy. Redirects are relayed to the caller, never followed.
    pub fn new(settings: ProxySettings) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ProxyError::Client)?;

        Ok(Self {
            client,
            upstream_timeout: settings.upstream_timeout,
            metrics: None,
        })
    }

    /// Count response body failures in `metrics`. Failures before the
    /// response headers are returned to the caller instead.
    pub fn with_metrics(mut self, metrics: GatewayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send `request` once and relay the upstream response.
    ///
    /// Any response the upstream produces, including 4xx and 5xx, is relayed
    /// as-is. Only transport failures are errors.
    pub async fn forward(&self, request: OutboundRequest) -> Result<Response, ProxyError> {
        let OutboundRequest {
            upstream,
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if !body.is_end_stream() {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        let outbound = builder.build().map_err(|source| ProxyError::Construction {
            upstream: upstream.clone(),
            source,
        })?;

        tracing::debug!(
            upstream = %upstream,
            method = %outbound.method(),
            url = %outbound.url(),
            "forwarding request"
        );

        let response = match tokio::time::timeout(
            self.upstream_timeout,
            self.client.execute(outbound),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(source)) if source.is_builder() => {
                return Err(ProxyError::Construction { upstream, source })
            }
            Ok(Err(source)) => return Err(ProxyError::Unavailable { upstream, source }),
            Err(_) => {
                return Err(ProxyError::Timeout {
                    upstream,
                    after: self.upstream_timeout,
                })
            }
        };

        Ok(self.relay(upstream, response))
    }

    /// Convert an upstream response into a client response, streaming the body.
    fn relay(&self, upstream: String, response: reqwest::Response) -> Response {
        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = BodyRelay {
            chunks: Box::pin(response.bytes_stream()),
            upstream,
            idle: self.upstream_timeout,
            metrics: self.metrics.clone(),
        };
        let stream = stream::unfold(Some(body), |body| async move { body?.next_chunk().await });

        let mut relayed = Response::new(Body::from_stream(stream));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = headers;
        relayed
    }
}

type Chunks = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Upstream body in flight. Yields chunks until the body ends, fails, or
/// stalls for longer than `idle`; a failure is the stream's last item.
struct BodyRelay {
    chunks: Chunks,
    upstream: String,
    idle: Duration,
    metrics: Option<GatewayMetrics>,
}

impl BodyRelay {
    async fn next_chunk(mut self) -> Option<(Result<Bytes, ProxyError>, Option<Self>)> {
        let next = tokio::time::timeout(self.idle, self.chunks.next()).await;
        let failure = match next {
            Ok(Some(Ok(bytes))) => return Some((Ok(bytes), Some(self))),
            Ok(None) => return None,
            Ok(Some(Err(source))) => ProxyError::Unavailable {
                upstream: self.upstream,
                source,
            },
            Err(_) => ProxyError::Timeout {
                upstream: self.upstream,
                after: self.idle,
            },
        };

        tracing::warn!(error = %failure, "upstream response body interrupted");
        if let (Some(metrics), Some(upstream)) = (&self.metrics, failure.upstream()) {
            metrics.record_upstream_failure(upstream, failure.kind());
        }
        Some((Err(failure), None))
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}
