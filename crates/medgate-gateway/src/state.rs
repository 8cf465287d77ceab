//! Shared application state.
//!
//! Everything here is built once at startup and read concurrently by every
//! request. Nothing is mutated after construction apart from the metric
//! counters, which synchronize internally.

use std::sync::Arc;

use medgate_auth::TokenVerifier;

use crate::config::GatewayConfig;
use crate::middleware::metrics::GatewayMetrics;
use crate::proxy::{ProxyError, ReverseProxy};
use crate::routing::RouteTable;

/// State handed to every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub routes: Arc<RouteTable>,
    pub verifier: Arc<TokenVerifier>,
    pub proxy: ReverseProxy,
    pub metrics: GatewayMetrics,
}

/// Failure to assemble the state from a valid configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl GatewayState {
    /// Assemble state from already-built parts.
    pub fn new(
        routes: RouteTable,
        verifier: TokenVerifier,
        proxy: ReverseProxy,
    ) -> Result<Self, StateError> {
        let metrics = GatewayMetrics::new()?;
        Ok(Self {
            routes: Arc::new(routes),
            verifier: Arc::new(verifier),
            proxy: proxy.with_metrics(metrics.clone()),
            metrics,
        })
    }

    /// Build the verifier, proxy client and metrics registry from configuration.
    pub fn from_config(config: GatewayConfig) -> Result<Self, StateError> {
        let verifier = TokenVerifier::new(config.secret).with_leeway(config.jwt_leeway_secs);
        let proxy = ReverseProxy::new(config.proxy)?;
        Self::new(config.routes, verifier, proxy)
    }
}
