//! # Gateway Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse` for
//! every response the gateway synthesizes itself. Responses relayed from a
//! backend never pass through here.
//!
//! Client errors are logged at `debug`, upstream failures at `error`, so a
//! dependency outage is never confused with a misbehaving caller. Internal
//! error details are never exposed in responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use medgate_auth::TokenError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proxy::ProxyError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NO_ROUTE", "UNAUTHORIZED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured context, set for 401s only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors the gateway answers locally, without a backend response.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No route rule matches the request (404).
    #[error("no route for {method} {path}")]
    NoRoute {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// Missing or invalid credential on a route that requires one (401).
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),

    /// The request cannot be forwarded as sent (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upstream could not be reached or did not answer in time (502).
    /// The detail is logged but not returned to the client.
    #[error("upstream {upstream} unavailable: {detail}")]
    UpstreamUnavailable {
        /// Upstream service name, returned to the client.
        upstream: String,
        /// Transport-level cause.
        detail: String,
    },

    /// Gateway fault (500). The message goes to the log only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Status and stable error code sent to the client.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NoRoute { .. } => (StatusCode::NOT_FOUND, "NO_ROUTE"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::UpstreamUnavailable { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match &self {
            Self::Unauthorized(err) => (
                "A valid bearer credential is required".to_string(),
                Some(serde_json::json!({ "reason": err.reason() })),
            ),
            Self::UpstreamUnavailable { upstream, .. } => (
                format!("Upstream service {upstream} is unavailable"),
                None,
            ),
            Self::Internal(_) => ("An internal error occurred".to_string(), None),
            other => (other.to_string(), None),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal gateway error"),
            Self::UpstreamUnavailable { .. } => tracing::error!(error = %self, "upstream failure"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Unauthorized(_)) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Bearer error="invalid_token""#),
            );
        }
        response
    }
}

/// Transport failures are upstream outages; construction failures are ours.
impl From<ProxyError> for GatewayError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Unavailable { upstream, source } => Self::UpstreamUnavailable {
                upstream,
                detail: source.to_string(),
            },
            ProxyError::Timeout { upstream, after } => Self::UpstreamUnavailable {
                upstream,
                detail: format!("no response within {after:?}"),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}
