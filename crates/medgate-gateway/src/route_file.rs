//! # Route File
//!
//! YAML source for the [`RouteTable`]. The built-in table for the medgate
//! services is compiled in from `config/routes.default.yaml`; deployments
//! may supply their own file with the same format:
//!
//! ```yaml
//! upstreams:                 # optional fallback URLs
//!   users: http://users:8081
//! routes:
//!   - name: users-login
//!     method: POST           # omitted, "*" or "ANY" = every method
//!     match: { exact: /api/users/login }
//!     upstream: users
//!     rewrite: { fixed: /login }   # or strip_prefix / preserve
//!     auth: optional         # default: required
//! ```
//!
//! An upstream's base URL is read from `<NAME>_SERVICE_URL` (upper-cased,
//! `-` replaced by `_`). The variable wins over the file's `upstreams`
//! entry; a service with neither is a fatal configuration error.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::routing::{AuthPolicy, MethodPattern, Rewrite, RouteRule, RouteTable, Upstream};

/// The built-in route table.
pub const DEFAULT_ROUTES: &str = include_str!("../config/routes.default.yaml");

/// Parsed route file, before upstream URLs are resolved.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteFile {
    #[serde(default)]
    upstreams: BTreeMap<String, String>,
    routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteSpec {
    name: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(rename = "match")]
    pattern: PatternSpec,
    upstream: String,
    #[serde(default)]
    rewrite: Option<RewriteSpec>,
    #[serde(default)]
    auth: AuthPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternSpec {
    #[serde(default)]
    exact: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RewriteSpec {
    Mode(RewriteMode),
    Fixed { fixed: String },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RewriteMode {
    StripPrefix,
    Preserve,
}

impl From<RewriteSpec> for Rewrite {
    fn from(spec: RewriteSpec) -> Self {
        match spec {
            RewriteSpec::Mode(RewriteMode::StripPrefix) => Rewrite::StripPrefix,
            RewriteSpec::Mode(RewriteMode::Preserve) => Rewrite::Preserve,
            RewriteSpec::Fixed { fixed } => Rewrite::Fixed(fixed),
        }
    }
}

/// Environment variable holding the base URL of upstream `name`.
pub fn upstream_env_var(name: &str) -> String {
    format!("{}_SERVICE_URL", name.to_ascii_uppercase().replace('-', "_"))
}

impl RouteFile {
    /// Parse a route file from YAML text.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a route file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::RouteFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The compiled-in default table.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_ROUTES)
    }

    /// Upstream service names in first-reference order, without duplicates.
    pub fn upstream_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for route in &self.routes {
            if !names.contains(&route.upstream.as_str()) {
                names.push(&route.upstream);
            }
        }
        names
    }

    /// Resolve upstream URLs through `lookup` and build the validated table.
    pub fn into_table<F>(self, lookup: F) -> Result<RouteTable, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut upstreams: HashMap<String, Upstream> = HashMap::new();
        for name in self.upstream_names() {
            let var = upstream_env_var(name);
            let url = lookup(&var)
                .or_else(|| self.upstreams.get(name).cloned())
                .ok_or(ConfigError::Missing(var))?;
            upstreams.insert(name.to_string(), Upstream::new(name, &url)?);
        }

        let mut rules = Vec::with_capacity(self.routes.len());
        for spec in self.routes {
            // Every referenced name was resolved above.
            let upstream = upstreams
                .get(&spec.upstream)
                .cloned()
                .ok_or_else(|| ConfigError::Missing(upstream_env_var(&spec.upstream)))?;
            rules.push(spec.into_rule(upstream)?);
        }

        Ok(RouteTable::new(rules)?)
    }
}

impl RouteSpec {
    fn into_rule(self, upstream: Upstream) -> Result<RouteRule, ConfigError> {
        let rule = match (self.pattern.exact, self.pattern.prefix) {
            (Some(path), None) => RouteRule::exact(&self.name, &path, upstream)?,
            (None, Some(prefix)) => RouteRule::prefix(&self.name, &prefix, upstream)?,
            _ => {
                return Err(ConfigError::RouteSpec {
                    route: self.name,
                    reason: "match must have exactly one of 'exact' or 'prefix'".into(),
                })
            }
        };

        let rule = match self.method.as_deref() {
            Some(method) => rule.methods(MethodPattern::parse(method)?),
            None => rule,
        };
        let rule = match self.rewrite {
            Some(rewrite) => rule.rewrite(rewrite.into())?,
            None => rule,
        };
        Ok(rule.auth(self.auth))
    }
}
