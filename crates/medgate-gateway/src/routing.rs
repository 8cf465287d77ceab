//! # Path Router
//!
//! Maps an inbound method and path to the upstream service that owns it and
//! to the path that service should see.
//!
//! ## Matching
//!
//! Rules are tried in declaration order and the first structural match wins.
//! Ordering is therefore part of the configuration contract: a specific rule
//! must come before a general rule that would otherwise swallow its traffic.
//! [`RouteTable::new`] rejects a table in which some rule can never match
//! because an earlier rule covers every request it would see.
//!
//! | Pattern          | Matches                                 | Captured suffix |
//! |------------------|-----------------------------------------|-----------------|
//! | exact `/a/b`     | `/a/b` only                             | (empty)         |
//! | prefix `/a`      | `/a`, `/a/`, `/a/...` (not `/ab`)       | `""`, `/`, `/...` |
//! | prefix `/`       | every path                              | the whole path  |
//!
//! ## Rewrite
//!
//! The outbound path is the upstream base path followed by:
//!
//! - [`Rewrite::StripPrefix`]: the captured suffix (default for prefix rules);
//! - [`Rewrite::Fixed`]: a fixed path;
//! - [`Rewrite::Preserve`]: the full inbound path (default for exact rules).
//!
//! An empty result becomes `/`. The query string is carried over unchanged.
//! Inbound paths with dot segments are refused before routing (see
//! [`has_dot_segment`]), so the outbound path is never renormalized.

use std::collections::HashSet;
use std::fmt;

use axum::http::Method;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Route table construction failures. All are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteConfigError {
    /// The table has no rules.
    #[error("route table is empty")]
    Empty,

    /// Two rules share a name.
    #[error("duplicate route name: {0}")]
    DuplicateName(String),

    /// A path pattern or fixed rewrite is not an absolute path.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A method name is not a valid HTTP method token.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// An upstream base URL is unusable.
    #[error("invalid upstream {name} ({url}): {reason}")]
    InvalidUpstream {
        /// Upstream service name.
        name: String,
        /// The configured URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A rule can never match because an earlier rule covers it.
    #[error("route {rule} is unreachable: every request it matches is taken by earlier route {by}")]
    Shadowed {
        /// The unreachable rule.
        rule: String,
        /// The earlier rule that covers it.
        by: String,
    },
}

// ── Patterns ────────────────────────────────────────────────────────────────

/// Which HTTP methods a rule accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    /// Every method.
    Any,
    /// Exactly this method.
    Only(Method),
}

impl MethodPattern {
    /// Parse `*`, `ANY`, or a method name (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self, RouteConfigError> {
        if raw == "*" || raw.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }
        Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map(Self::Only)
            .map_err(|_| RouteConfigError::InvalidMethod(raw.to_string()))
    }

    fn matches(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(m) => m == method,
        }
    }

    fn covers(&self, other: &MethodPattern) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (Self::Only(a), Self::Only(b)) => a == b,
            (Self::Only(_), Self::Any) => false,
        }
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Only(m) => f.write_str(m.as_str()),
        }
    }
}

/// Which paths a rule accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// The path must equal this string.
    Exact(String),
    /// The path must equal this prefix or continue it with `/`.
    /// Stored without a trailing slash; the root prefix is stored empty.
    Prefix(String),
}

fn check_absolute(pattern: &str) -> Result<(), RouteConfigError> {
    if !pattern.starts_with('/') {
        return Err(RouteConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "must start with '/'",
        });
    }
    if pattern.contains(['?', '#']) {
        return Err(RouteConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "must not contain a query or fragment",
        });
    }
    if has_dot_segment(pattern) {
        return Err(RouteConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "must not contain '.' or '..' segments",
        });
    }
    Ok(())
}

/// Whether `path` has a `.` or `..` segment, literal or percent-encoded.
///
/// URL serialization resolves these segments, so a path carrying one would
/// reach a backend path other than the one its matched rule owns. Special
/// schemes treat `\` as a separator too.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

impl PathPattern {
    /// Exact-match pattern.
    pub fn exact(path: &str) -> Result<Self, RouteConfigError> {
        check_absolute(path)?;
        Ok(Self::Exact(path.to_string()))
    }

    /// Prefix pattern with wildcard tail. A trailing slash is ignored.
    pub fn prefix(prefix: &str) -> Result<Self, RouteConfigError> {
        check_absolute(prefix)?;
        Ok(Self::Prefix(prefix.trim_end_matches('/').to_string()))
    }

    /// Return the captured suffix if `path` matches.
    fn capture<'p>(&self, path: &'p str) -> Option<&'p str> {
        match self {
            Self::Exact(p) => (p == path).then_some(""),
            Self::Prefix(p) => {
                let rest = path.strip_prefix(p.as_str())?;
                (rest.is_empty() || rest.starts_with('/')).then_some(rest)
            }
        }
    }

    fn covers(&self, other: &PathPattern) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Exact(_), Self::Prefix(_)) => false,
            (Self::Prefix(_), Self::Exact(b)) => self.capture(b).is_some(),
            (Self::Prefix(_), Self::Prefix(b)) => {
                // The root prefix is stored empty but matches as "/".
                let b = if b.is_empty() { "/" } else { b.as_str() };
                self.capture(b).is_some()
            }
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => f.write_str(p),
            Self::Prefix(p) => write!(f, "{p}/*"),
        }
    }
}

/// How the matched path is turned into the upstream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Upstream base path + captured suffix.
    StripPrefix,
    /// Upstream base path + this fixed path.
    Fixed(String),
    /// Upstream base path + the full inbound path.
    Preserve,
}

/// Whether a route needs a verified caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// A valid bearer credential is mandatory; failures are answered with 401.
    #[default]
    Required,
    /// A valid credential is forwarded as identity; anything else proceeds anonymously.
    Optional,
}

impl AuthPolicy {
    /// Return the string representation of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
        }
    }
}

// ── Upstream ────────────────────────────────────────────────────────────────

/// A backend service reachable through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    name: String,
    base: Url,
}

impl Upstream {
    /// Validate and wrap an upstream base URL.
    ///
    /// The URL must be absolute `http` or `https` with a host, and must not
    /// carry credentials, a query, or a fragment.
    pub fn new(name: impl Into<String>, base: &str) -> Result<Self, RouteConfigError> {
        let name = name.into();
        let invalid = |reason: String| RouteConfigError::InvalidUpstream {
            name: name.clone(),
            url: base.to_string(),
            reason,
        };

        let url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".into()));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("credentials in upstream URL are not allowed".into()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed".into()));
        }

        Ok(Self { name, base: url })
    }

    /// Service name, used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL as configured.
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn base_path(&self) -> &str {
        self.base.path().trim_end_matches('/')
    }
}

// ── RouteRule ───────────────────────────────────────────────────────────────

/// A single routing rule. Build with [`RouteRule::prefix`] or
/// [`RouteRule::exact`] and refine with the builder methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    name: String,
    method: MethodPattern,
    path: PathPattern,
    upstream: Upstream,
    rewrite: Rewrite,
    auth: AuthPolicy,
}

impl RouteRule {
    /// Prefix rule for any method, stripping the prefix, authentication required.
    pub fn prefix(
        name: impl Into<String>,
        prefix: &str,
        upstream: Upstream,
    ) -> Result<Self, RouteConfigError> {
        Ok(Self {
            name: name.into(),
            method: MethodPattern::Any,
            path: PathPattern::prefix(prefix)?,
            upstream,
            rewrite: Rewrite::StripPrefix,
            auth: AuthPolicy::Required,
        })
    }

    /// Exact rule for any method, preserving the path, authentication required.
    pub fn exact(
        name: impl Into<String>,
        path: &str,
        upstream: Upstream,
    ) -> Result<Self, RouteConfigError> {
        Ok(Self {
            name: name.into(),
            method: MethodPattern::Any,
            path: PathPattern::exact(path)?,
            upstream,
            rewrite: Rewrite::Preserve,
            auth: AuthPolicy::Required,
        })
    }

    /// Restrict the rule to one method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = MethodPattern::Only(method);
        self
    }

    /// Replace the method pattern.
    pub fn methods(mut self, pattern: MethodPattern) -> Self {
        self.method = pattern;
        self
    }

    /// Set the rewrite. A fixed rewrite must be an absolute path.
    pub fn rewrite(mut self, rewrite: Rewrite) -> Result<Self, RouteConfigError> {
        if let Rewrite::Fixed(path) = &rewrite {
            check_absolute(path)?;
        }
        self.rewrite = rewrite;
        Ok(self)
    }

    /// Set the authentication policy.
    pub fn auth(mut self, policy: AuthPolicy) -> Self {
        self.auth = policy;
        self
    }

    /// Rule name, unique within a table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method pattern.
    pub fn method_pattern(&self) -> &MethodPattern {
        &self.method
    }

    /// Path pattern.
    pub fn path_pattern(&self) -> &PathPattern {
        &self.path
    }

    /// Target service.
    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Authentication policy.
    pub fn auth_policy(&self) -> AuthPolicy {
        self.auth
    }

    fn shadows(&self, later: &RouteRule) -> bool {
        self.method.covers(&later.method) && self.path.covers(&later.path)
    }
}

// ── RouteTable ──────────────────────────────────────────────────────────────

/// Ordered, validated, immutable set of routing rules.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Validate rules and build the table.
    pub fn new(rules: Vec<RouteRule>) -> Result<Self, RouteConfigError> {
        if rules.is_empty() {
            return Err(RouteConfigError::Empty);
        }

        let mut names = HashSet::new();
        for rule in &rules {
            if !names.insert(rule.name.as_str()) {
                return Err(RouteConfigError::DuplicateName(rule.name.clone()));
            }
        }

        for (i, later) in rules.iter().enumerate() {
            if let Some(earlier) = rules[..i].iter().find(|earlier| earlier.shadows(later)) {
                return Err(RouteConfigError::Shadowed {
                    rule: later.name.clone(),
                    by: earlier.name.clone(),
                });
            }
        }

        Ok(Self { rules })
    }

    /// Find the first rule matching `method` and `path`.
    pub fn route<'a, 'p>(&'a self, method: &Method, path: &'p str) -> Option<RouteMatch<'a, 'p>> {
        self.rules.iter().find_map(|rule| {
            if !rule.method.matches(method) {
                return None;
            }
            rule.path.capture(path).map(|suffix| RouteMatch { rule, path, suffix })
        })
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

/// A successful routing decision.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a, 'p> {
    rule: &'a RouteRule,
    path: &'p str,
    suffix: &'p str,
}

impl<'a, 'p> RouteMatch<'a, 'p> {
    /// The rule that matched.
    pub fn rule(&self) -> &'a RouteRule {
        self.rule
    }

    /// The part of the path after the matched prefix (empty for exact rules).
    pub fn suffix(&self) -> &'p str {
        self.suffix
    }

    /// Path the upstream service will see.
    pub fn outbound_path(&self) -> String {
        let tail = match &self.rule.rewrite {
            Rewrite::StripPrefix => self.suffix,
            Rewrite::Fixed(path) => path.as_str(),
            Rewrite::Preserve => self.path,
        };
        let joined = format!("{}{}", self.rule.upstream.base_path(), tail);
        if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        }
    }

    /// Full upstream URL, carrying the inbound query string.
    pub fn upstream_url(&self, query: Option<&str>) -> Url {
        let mut url = self.rule.upstream.base.clone();
        url.set_path(&self.outbound_path());
        url.set_query(query);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(name: &str, url: &str) -> Upstream {
        Upstream::new(name, url).unwrap()
    }

    fn appointments() -> Upstream {
        upstream("appointments", "http://appointments:8083")
    }

    // ── matching ─────────────────────────────────────────────────

    #[test]
    fn prefix_rule_strips_prefix() {
        let table = RouteTable::new(vec![RouteRule::prefix(
            "appointments",
            "/api/appointments",
            appointments(),
        )
        .unwrap()])
        .unwrap();

        let matched = table.route(&Method::GET, "/api/appointments/42").unwrap();
        assert_eq!(matched.rule().name(), "appointments");
        assert_eq!(matched.suffix(), "/42");
        assert_eq!(matched.outbound_path(), "/42");
        assert_eq!(
            matched.upstream_url(None).as_str(),
            "http://appointments:8083/42"
        );
    }

    #[test]
    fn prefix_rule_empty_suffix_maps_to_root() {
        let table = RouteTable::new(vec![RouteRule::prefix(
            "appointments",
            "/api/appointments",
            appointments(),
        )
        .unwrap()])
        .unwrap();

        let matched = table.route(&Method::POST, "/api/appointments").unwrap();
        assert_eq!(matched.suffix(), "");
        assert_eq!(matched.outbound_path(), "/");

        let matched = table.route(&Method::POST, "/api/appointments/").unwrap();
        assert_eq!(matched.outbound_path(), "/");
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        let table = RouteTable::new(vec![RouteRule::prefix(
            "appointments",
            "/api/appointments",
            appointments(),
        )
        .unwrap()])
        .unwrap();
        assert!(table.route(&Method::GET, "/api/appointmentsX").is_none());
        assert!(table.route(&Method::GET, "/api").is_none());
        assert!(table.route(&Method::GET, "/").is_none());
    }

    #[test]
    fn upstream_base_path_is_prepended() {
        let table = RouteTable::new(vec![RouteRule::prefix(
            "records",
            "/api/medical-records",
            upstream("medical-records", "http://records:8080/v2/"),
        )
        .unwrap()])
        .unwrap();

        let matched = table
            .route(&Method::GET, "/api/medical-records/9/files")
            .unwrap();
        assert_eq!(matched.outbound_path(), "/v2/9/files");

        let matched = table.route(&Method::GET, "/api/medical-records").unwrap();
        assert_eq!(matched.outbound_path(), "/v2");
    }

    #[test]
    fn query_string_is_carried_over() {
        let table = RouteTable::new(vec![RouteRule::prefix(
            "appointments",
            "/api/appointments",
            appointments(),
        )
        .unwrap()])
        .unwrap();
        let matched = table.route(&Method::GET, "/api/appointments").unwrap();
        assert_eq!(
            matched.upstream_url(Some("date=2026-10-18&page=2")).as_str(),
            "http://appointments:8083/?date=2026-10-18&page=2"
        );
    }

    #[test]
    fn exact_rule_with_fixed_rewrite() {
        let users = upstream("users", "http://users:8081");
        let table = RouteTable::new(vec![RouteRule::exact("login", "/api/users/login", users)
            .unwrap()
            .method(Method::POST)
            .rewrite(Rewrite::Fixed("/login".into()))
            .unwrap()
            .auth(AuthPolicy::Optional)])
        .unwrap();

        let matched = table.route(&Method::POST, "/api/users/login").unwrap();
        assert_eq!(matched.outbound_path(), "/login");
        assert_eq!(matched.rule().auth_policy(), AuthPolicy::Optional);
        assert!(table.route(&Method::GET, "/api/users/login").is_none());
        assert!(table.route(&Method::POST, "/api/users/login/x").is_none());
    }

    #[test]
    fn exact_rule_preserves_path_by_default() {
        let table = RouteTable::new(vec![RouteRule::exact(
            "status",
            "/api/status",
            upstream("status", "http://status:9000"),
        )
        .unwrap()])
        .unwrap();
        let matched = table.route(&Method::GET, "/api/status").unwrap();
        assert_eq!(matched.outbound_path(), "/api/status");
    }

    #[test]
    fn root_prefix_matches_everything() {
        let table = RouteTable::new(vec![RouteRule::prefix(
            "catch-all",
            "/",
            upstream("legacy", "http://legacy:80"),
        )
        .unwrap()])
        .unwrap();
        let matched = table.route(&Method::DELETE, "/anything/at/all").unwrap();
        assert_eq!(matched.outbound_path(), "/anything/at/all");
        let matched = table.route(&Method::GET, "/").unwrap();
        assert_eq!(matched.outbound_path(), "/");
    }

    #[test]
    fn method_specific_rule() {
        let clinics = upstream("clinics", "http://clinics:8082");
        let table = RouteTable::new(vec![
            RouteRule::prefix("clinics-directory", "/api/clinics", clinics.clone())
                .unwrap()
                .method(Method::GET)
                .auth(AuthPolicy::Optional),
            RouteRule::prefix("clinics", "/api/clinics", clinics).unwrap(),
        ])
        .unwrap();

        let get = table.route(&Method::GET, "/api/clinics/3").unwrap();
        assert_eq!(get.rule().name(), "clinics-directory");
        let put = table.route(&Method::PUT, "/api/clinics/3").unwrap();
        assert_eq!(put.rule().name(), "clinics");
    }

    // ── ordering ─────────────────────────────────────────────────

    #[test]
    fn first_declared_match_wins() {
        let users = upstream("users", "http://users:8081");
        let table = RouteTable::new(vec![
            RouteRule::exact("login", "/api/users/login", users.clone())
                .unwrap()
                .rewrite(Rewrite::Fixed("/login".into()))
                .unwrap(),
            RouteRule::prefix("users", "/api/users", users).unwrap(),
        ])
        .unwrap();

        let matched = table.route(&Method::POST, "/api/users/login").unwrap();
        assert_eq!(matched.rule().name(), "login");
        let matched = table.route(&Method::GET, "/api/users/5").unwrap();
        assert_eq!(matched.rule().name(), "users");
    }

    #[test]
    fn later_overlapping_rule_still_reachable_for_its_own_paths() {
        let table = RouteTable::new(vec![
            RouteRule::prefix("deep", "/api/a/b", upstream("deep", "http://deep:1")).unwrap(),
            RouteRule::prefix("shallow", "/api/a", upstream("shallow", "http://shallow:1"))
                .unwrap(),
        ])
        .unwrap();
        assert_eq!(
            table.route(&Method::GET, "/api/a/b/c").unwrap().rule().name(),
            "deep"
        );
        assert_eq!(
            table.route(&Method::GET, "/api/a/c").unwrap().rule().name(),
            "shallow"
        );
    }

    // ── validation ───────────────────────────────────────────────

    #[test]
    fn shadowed_rule_rejected() {
        let users = upstream("users", "http://users:8081");
        let err = RouteTable::new(vec![
            RouteRule::prefix("users", "/api/users", users.clone()).unwrap(),
            RouteRule::exact("login", "/api/users/login", users).unwrap(),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RouteConfigError::Shadowed {
                rule: "login".into(),
                by: "users".into()
            }
        );
    }

    #[test]
    fn method_specific_rule_does_not_shadow_any_method_rule() {
        let clinics = upstream("clinics", "http://clinics:8082");
        assert!(RouteTable::new(vec![
            RouteRule::prefix("get", "/api/clinics", clinics.clone())
                .unwrap()
                .method(Method::GET),
            RouteRule::prefix("all", "/api/clinics", clinics).unwrap(),
        ])
        .is_ok());
    }

    #[test]
    fn any_method_rule_shadows_method_specific_rule() {
        let clinics = upstream("clinics", "http://clinics:8082");
        let err = RouteTable::new(vec![
            RouteRule::prefix("all", "/api/clinics", clinics.clone()).unwrap(),
            RouteRule::prefix("get", "/api/clinics/open", clinics)
                .unwrap()
                .method(Method::GET),
        ])
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::Shadowed { .. }));
    }

    #[test]
    fn root_prefix_shadows_everything_after_it() {
        let err = RouteTable::new(vec![
            RouteRule::prefix("all", "/", upstream("a", "http://a:1")).unwrap(),
            RouteRule::prefix("root-again", "/", upstream("b", "http://b:1")).unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(err, RouteConfigError::Shadowed { .. }));
    }

    #[test]
    fn duplicate_names_rejected() {
        let a = upstream("a", "http://a:1");
        let err = RouteTable::new(vec![
            RouteRule::prefix("dup", "/x", a.clone()).unwrap(),
            RouteRule::prefix("dup", "/y", a).unwrap(),
        ])
        .unwrap_err();
        assert_eq!(err, RouteConfigError::DuplicateName("dup".into()));
    }

    #[test]
    fn empty_table_rejected() {
        assert_eq!(RouteTable::new(vec![]).unwrap_err(), RouteConfigError::Empty);
    }

    #[test]
    fn relative_patterns_rejected() {
        assert!(PathPattern::prefix("api/x").is_err());
        assert!(PathPattern::exact("").is_err());
        assert!(PathPattern::exact("/x?y=1").is_err());
        let a = upstream("a", "http://a:1");
        assert!(RouteRule::exact("r", "/x", a)
            .unwrap()
            .rewrite(Rewrite::Fixed("login".into()))
            .is_err());
    }

    #[test]
    fn dot_segments_detected_in_every_spelling() {
        for path in [
            "/open/../secure/data",
            "/open/./x",
            "/open/..",
            "/open/%2e%2e/secure",
            "/open/%2E%2e/secure",
            "/open/.%2E/secure",
            "/open/%2e/x",
            "/open/..\\secure",
        ] {
            assert!(has_dot_segment(path), "{path} not flagged");
        }
        for path in [
            "/",
            "/open/data",
            "/open/.well-known",
            "/open/a..b",
            "/open/...",
            "/open/%2e%2e%2e",
        ] {
            assert!(!has_dot_segment(path), "{path} flagged");
        }
    }

    #[test]
    fn dot_segments_rejected_in_patterns() {
        assert!(PathPattern::prefix("/api/../admin").is_err());
        assert!(PathPattern::exact("/api/%2e%2e").is_err());
        let a = upstream("a", "http://a:1");
        assert!(RouteRule::exact("r", "/x", a)
            .unwrap()
            .rewrite(Rewrite::Fixed("/./login".into()))
            .is_err());
    }

    #[test]
    fn upstream_validation() {
        assert!(Upstream::new("ok", "https://records.internal:8443/base").is_ok());
        assert!(Upstream::new("bad", "not a url").is_err());
        assert!(Upstream::new("ftp", "ftp://files:21").is_err());
        assert!(Upstream::new("creds", "http://user:pw@host:1").is_err());
        assert!(Upstream::new("query", "http://host:1/?a=b").is_err());
    }

    #[test]
    fn method_pattern_parsing() {
        assert_eq!(MethodPattern::parse("*").unwrap(), MethodPattern::Any);
        assert_eq!(MethodPattern::parse("any").unwrap(), MethodPattern::Any);
        assert_eq!(
            MethodPattern::parse("post").unwrap(),
            MethodPattern::Only(Method::POST)
        );
        assert!(MethodPattern::parse("GE T").is_err());
    }

    #[test]
    fn patterns_display() {
        assert_eq!(PathPattern::prefix("/api/x/").unwrap().to_string(), "/api/x/*");
        assert_eq!(PathPattern::exact("/api/x").unwrap().to_string(), "/api/x");
        assert_eq!(MethodPattern::Only(Method::GET).to_string(), "GET");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn table() -> RouteTable {
            RouteTable::new(vec![
                RouteRule::exact("login", "/api/users/login", upstream("users", "http://users:8081"))
                    .unwrap()
                    .rewrite(Rewrite::Fixed("/login".into()))
                    .unwrap(),
                RouteRule::prefix("users", "/api/users", upstream("users", "http://users:8081"))
                    .unwrap(),
                RouteRule::prefix("appointments", "/api/appointments", appointments()).unwrap(),
            ])
            .unwrap()
        }

        proptest! {
            /// Outbound path is base path + captured suffix for any suffix.
            #[test]
            fn prefix_rewrite_appends_suffix(suffix in "(/[a-z0-9._-]{1,8}){0,4}") {
                let table = table();
                let path = format!("/api/appointments{suffix}");
                let matched = table.route(&Method::GET, &path).unwrap();
                prop_assert_eq!(matched.rule().name(), "appointments");
                let expected = if suffix.is_empty() { "/".to_string() } else { suffix.clone() };
                prop_assert_eq!(matched.outbound_path(), expected);
            }

            /// The earlier exact rule wins over the later prefix rule whatever the method.
            #[test]
            fn earlier_rule_wins(method in prop::sample::select(vec![
                Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH,
            ])) {
                let table = table();
                let matched = table.route(&method, "/api/users/login").unwrap();
                prop_assert_eq!(matched.rule().name(), "login");
            }

            /// Without dot segments the URL keeps the outbound path as built.
            #[test]
            fn upstream_url_preserves_outbound_path(suffix in "(/[a-z0-9._-]{1,8}){0,4}") {
                let path = format!("/api/appointments{suffix}");
                prop_assume!(!has_dot_segment(&path));
                let table = table();
                let matched = table.route(&Method::GET, &path).unwrap();
                let url = matched.upstream_url(None);
                prop_assert_eq!(url.path(), matched.outbound_path());
            }

            /// Paths outside every prefix never match.
            #[test]
            fn unrelated_paths_never_match(path in "/(x|y|z)[a-z/]{0,20}") {
                prop_assert!(table().route(&Method::GET, &path).is_none());
            }
        }
    }
}
