//! # Forwarding Handler
//!
//! One request moves through
//! `Received → Authenticated|Anonymous → Routed → Forwarding → Completed|Failed`
//! with no retries and no backtracking:
//!
//! 1. verify the bearer credential and keep the outcome;
//! 2. refuse dot segments (400), then route by method and path (no match → 404);
//! 3. apply the rule's auth policy (required + failure → 401, the backend
//!    is never contacted);
//! 4. build the outbound headers, attaching identity last;
//! 5. forward and relay, or answer the failure locally.

use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::auth::{authenticate, authorize};
use crate::error::GatewayError;
use crate::middleware::metrics::RouteLabel;
use crate::propagate::attach_identity;
use crate::proxy::{strip_hop_by_hop, OutboundRequest};
use crate::routing::has_dot_segment;
use crate::state::GatewayState;

/// Build the forwarding router. Every request reaches [`forward`].
pub fn router() -> Router<GatewayState> {
    Router::new().fallback(forward)
}

/// Authenticate, route, and proxy one request.
pub async fn forward(State(state): State<GatewayState>, request: Request) -> Response {
    let outcome = authenticate(request.headers(), &state.verifier);

    let (parts, body) = request.into_parts();
    if has_dot_segment(parts.uri.path()) {
        return GatewayError::BadRequest("path contains a '.' or '..' segment".into())
            .into_response();
    }
    let Some(matched) = state.routes.route(&parts.method, parts.uri.path()) else {
        return GatewayError::NoRoute {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
        }
        .into_response();
    };
    let rule = matched.rule();
    let label = RouteLabel(rule.name().to_string());

    let result: Result<Response, GatewayError> = async {
        let identity = authorize(rule.auth_policy(), outcome).map_err(|err| {
            state.metrics.record_auth_failure(err.reason());
            tracing::warn!(
                route = rule.name(),
                reason = err.reason(),
                kind = err.kind().as_str(),
                "rejected unauthenticated request"
            );
            GatewayError::Unauthorized(err)
        })?;

        let mut headers = parts.headers.clone();
        headers.remove(HOST);
        strip_hop_by_hop(&mut headers);
        // Last header mutation before the outbound call.
        attach_identity(&mut headers, identity.as_ref())
            .map_err(|e| GatewayError::Internal(format!("identity header: {e}")))?;

        let upstream = rule.upstream().name().to_string();
        tracing::debug!(
            route = rule.name(),
            upstream = %upstream,
            anonymous = identity.is_none(),
            "routed request"
        );

        state
            .proxy
            .forward(OutboundRequest {
                upstream: upstream.clone(),
                method: parts.method.clone(),
                url: matched.upstream_url(parts.uri.query()),
                headers,
                body,
            })
            .await
            .map_err(|err| {
                state.metrics.record_upstream_failure(&upstream, err.kind());
                GatewayError::from(err)
            })
    }
    .await;

    let mut response = result.unwrap_or_else(IntoResponse::into_response);
    response.extensions_mut().insert(label);
    response
}
