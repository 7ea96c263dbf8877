//! Development proxy routing table.
//!
//! # Design Decisions
//! - Rules are an ordered list; the first matching rule wins
//! - A matching proxy rule always beats local serving, even when a built
//!   artifact exists at the same path
//! - Patterns with glob metacharacters match the whole path; anything else
//!   is a path-segment prefix (`/api` matches `/api/items`, not `/apiary`)
//! - Only plain `http://` backends are supported

use indexmap::IndexMap;
use url::Url;

use crate::config::{PathRewrite, ProxyOptions};
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone)]
pub enum ProxyPattern {
    Prefix(String),
    Glob(glob::Pattern),
}

impl ProxyPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() || !pattern.starts_with('/') {
            return Err(ConfigError::MalformedProxy {
                pattern: pattern.to_string(),
                message: "pattern must start with '/'".to_string(),
            });
        }

        if pattern.contains(['*', '?', '[']) {
            let glob = glob::Pattern::new(pattern).map_err(|e| ConfigError::MalformedProxy {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            Ok(ProxyPattern::Glob(glob))
        } else {
            Ok(ProxyPattern::Prefix(pattern.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            ProxyPattern::Glob(glob) => glob.matches(path),
            ProxyPattern::Prefix(prefix) => {
                if prefix.ends_with('/') {
                    return path.starts_with(prefix.as_str());
                }
                match path.strip_prefix(prefix.as_str()) {
                    Some(rest) => rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProxyPattern::Prefix(prefix) => prefix,
            ProxyPattern::Glob(glob) => glob.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyRule {
    pattern: ProxyPattern,
    target: Url,
    change_origin: bool,
    rewrite: Option<PathRewrite>,
    headers: IndexMap<String, String>,
}

impl ProxyRule {
    pub fn new(pattern: &str, options: ProxyOptions) -> Result<Self> {
        let pattern = ProxyPattern::parse(pattern)?;
        let malformed = |message: String| ConfigError::MalformedProxy {
            pattern: pattern.as_str().to_string(),
            message,
        };

        let target = Url::parse(&options.target)
            .map_err(|e| malformed(format!("invalid target '{}': {e}", options.target)))?;
        if target.scheme() != "http" {
            return Err(malformed(format!(
                "unsupported target scheme '{}' (only http is supported)",
                target.scheme()
            )));
        }
        if target.host_str().is_none() {
            return Err(malformed(format!("target '{}' has no host", options.target)));
        }
        if let Some(rewrite) = &options.rewrite {
            if !rewrite.from.starts_with('/') {
                return Err(malformed("rewrite.from must start with '/'".to_string()));
            }
        }

        Ok(Self {
            pattern,
            target,
            change_origin: options.change_origin,
            rewrite: options.rewrite,
            headers: options.headers,
        })
    }

    pub fn pattern(&self) -> &ProxyPattern {
        &self.pattern
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn change_origin(&self) -> bool {
        self.change_origin
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// `host[:port]` of the backend, as sent in a rewritten `Host` header.
    pub fn target_authority(&self) -> String {
        let host = self.target.host_str().unwrap_or_default();
        match self.target.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// `scheme://host[:port]` of the backend, as sent in a rewritten `Origin` header.
    pub fn target_origin(&self) -> String {
        self.target.origin().ascii_serialization()
    }

    /// Path and query to request from the backend.
    ///
    /// Applies the configured rewrite, then prefixes the target URL's own path.
    pub fn forward_path(&self, path_and_query: &str) -> String {
        let rewritten = match &self.rewrite {
            Some(rewrite) => match path_and_query.strip_prefix(rewrite.from.as_str()) {
                Some(rest) => format!("{}{}", rewrite.to, rest),
                None => path_and_query.to_string(),
            },
            None => path_and_query.to_string(),
        };

        let base = self.target.path().trim_end_matches('/');
        if rewritten.is_empty() || rewritten.starts_with('?') {
            return format!("{base}/{rewritten}");
        }
        if rewritten.starts_with('/') {
            format!("{base}{rewritten}")
        } else {
            format!("{base}/{rewritten}")
        }
    }

    /// Header values to set on a forwarded request.
    ///
    /// With `change_origin`, `Host` is rewritten to the target authority and
    /// `Origin` to the target origin when the request carried one. The rule's
    /// static headers come last and win.
    pub fn rewrite_headers(&self, has_origin: bool) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.headers.len() + 2);
        if self.change_origin {
            headers.push(("host".to_string(), self.target_authority()));
            if has_origin {
                headers.push(("origin".to_string(), self.target_origin()));
            }
        }
        headers.extend(self.headers.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())));
        headers
    }

    /// Absolute backend URI for a request.
    pub fn forward_uri(&self, path_and_query: &str) -> String {
        format!(
            "{}://{}{}",
            self.target.scheme(),
            self.target_authority(),
            self.forward_path(path_and_query)
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RouteDecision<'a> {
    Local,
    Forward(&'a ProxyRule),
}

impl RouteDecision<'_> {
    pub fn is_local(&self) -> bool {
        matches!(self, RouteDecision::Local)
    }
}

/// Read-only table of proxy rules consulted for every inbound request.
#[derive(Debug, Clone, Default)]
pub struct DevProxyRouter {
    rules: Vec<ProxyRule>,
}

impl DevProxyRouter {
    pub fn new(rules: Vec<ProxyRule>) -> Self {
        Self { rules }
    }

    /// Build the table from declared `pattern -> options` pairs, keeping order.
    pub fn from_decls<I>(decls: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, ProxyOptions)>,
    {
        let rules = decls
            .into_iter()
            .map(|(pattern, options)| ProxyRule::new(&pattern, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ProxyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide whether a request is forwarded or served locally.
    ///
    /// `path` excludes the query string. The method does not influence the
    /// decision; it is forwarded unchanged.
    pub fn route(&self, path: &str, method: &str) -> RouteDecision<'_> {
        match self.rules.iter().find(|rule| rule.pattern.matches(path)) {
            Some(rule) => {
                tracing::debug!(method, path, pattern = rule.pattern.as_str(), target = %rule.target, "proxy match");
                RouteDecision::Forward(rule)
            }
            None => RouteDecision::Local,
        }
    }
}
