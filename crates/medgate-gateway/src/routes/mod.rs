//! # Route Handlers
//!
//! - [`forward`]: the authenticating reverse proxy, mounted as the fallback
//!   so every path not served by the gateway itself reaches the route table.
//! - [`ops`]: unauthenticated health probes and the metrics scrape endpoint.

pub mod forward;
pub mod ops;
