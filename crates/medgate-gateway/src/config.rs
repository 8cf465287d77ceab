//! Gateway configuration.
//!
//! Read once at startup from environment variables (and an optional route
//! file) and immutable afterwards. Any missing or malformed value is a
//! [`ConfigError`]; the binary refuses to start on one.
//!
//! Variables:
//! - `GATEWAY_LISTEN_ADDR` (default: `0.0.0.0:8080`)
//! - `GATEWAY_JWT_SECRET` (required; there is no built-in fallback)
//! - `GATEWAY_JWT_LEEWAY_SECS` (default: 0)
//! - `GATEWAY_UPSTREAM_TIMEOUT_SECS` (default: 30)
//! - `GATEWAY_CONNECT_TIMEOUT_SECS` (default: 5)
//! - `<SERVICE>_SERVICE_URL` for every upstream the route table references

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use medgate_auth::{SharedSecret, TokenError};

use crate::proxy::ProxySettings;
use crate::route_file::RouteFile;
use crate::routing::{RouteConfigError, RouteTable};

/// Listen address variable.
pub const LISTEN_ADDR_VAR: &str = "GATEWAY_LISTEN_ADDR";
/// Shared token secret variable.
pub const JWT_SECRET_VAR: &str = "GATEWAY_JWT_SECRET";
/// Clock leeway variable.
pub const JWT_LEEWAY_VAR: &str = "GATEWAY_JWT_LEEWAY_SECS";
/// Upstream response timeout variable.
pub const UPSTREAM_TIMEOUT_VAR: &str = "GATEWAY_UPSTREAM_TIMEOUT_SECS";
/// Upstream connect timeout variable.
pub const CONNECT_TIMEOUT_VAR: &str = "GATEWAY_CONNECT_TIMEOUT_SECS";

const DEFAULT_LISTEN_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("cannot read route file {}: {source}", path.display())]
    RouteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid route file: {0}")]
    RouteFileFormat(#[from] serde_yaml::Error),

    #[error("invalid route {route}: {reason}")]
    RouteSpec { route: String, reason: String },

    #[error(transparent)]
    Routes(#[from] RouteConfigError),

    #[error("invalid token secret: {0}")]
    Secret(#[from] TokenError),
}

/// Complete gateway configuration.
///
/// `Debug` output is safe to log: the secret prints as `[REDACTED]`.
#[derive(Debug)]
pub struct GatewayConfig {
    /// Socket the gateway listens on.
    pub listen_addr: SocketAddr,
    /// Secret shared with the identity-issuing service.
    pub secret: SharedSecret,
    /// Clock skew tolerated on `exp` / `nbf`.
    pub jwt_leeway_secs: u32,
    /// Upstream timeouts.
    pub proxy: ProxySettings,
    /// Validated route table.
    pub routes: RouteTable,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// Routes come from `routes_file` when given, otherwise from the
    /// built-in table.
    pub fn from_env(routes_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok(), routes_file)
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, routes_file: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(JWT_SECRET_VAR)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing(JWT_SECRET_VAR.to_string()))?;
        let secret = SharedSecret::new(secret.into_bytes())?;

        let listen_addr = parse_var(&lookup, LISTEN_ADDR_VAR, DEFAULT_LISTEN_ADDR)?;
        let jwt_leeway_secs = parse_var(&lookup, JWT_LEEWAY_VAR, 0u32)?;
        let upstream_timeout = positive_secs(&lookup, UPSTREAM_TIMEOUT_VAR, 30)?;
        let connect_timeout = positive_secs(&lookup, CONNECT_TIMEOUT_VAR, 5)?;

        let file = match routes_file {
            Some(path) => RouteFile::load(path)?,
            None => RouteFile::builtin()?,
        };
        let routes = file.into_table(&lookup)?;

        Ok(Self {
            listen_addr,
            secret,
            jwt_leeway_secs,
            proxy: ProxySettings {
                upstream_timeout,
                connect_timeout,
            },
            routes,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn positive_secs<F>(lookup: &F, var: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var(lookup, var, default)? {
        0 => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            reason: "must be greater than zero".into(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
