//! Compiled proxy rules.
//!
//! A [`Rule`] is built once from its [`RuleConfig`] and never mutated; the
//! rule set shares it between requests through `Arc`.

use axum::http::uri::{Authority, Scheme};
use axum::http::Method;

use crate::config::{Protocol, RuleConfig};
use crate::hooks::{HookPipeline, HookRegistry};
use crate::routing::template::{PathTemplate, TemplateError};

/// Error raised while compiling a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("rule '{rule}': invalid path template: {source}")]
    Template {
        rule: String,
        #[source]
        source: TemplateError,
    },
    #[error("rule '{rule}': invalid method '{method}'")]
    Method { rule: String, method: String },
    #[error("rule '{rule}': invalid backend: {source}")]
    Backend {
        rule: String,
        #[source]
        source: TargetError,
    },
    #[error("rule '{rule}': backend path uses uncaptured parameter '{param}'")]
    UnboundParam { rule: String, param: String },
    #[error("rule '{rule}': unknown hook '{hook}'")]
    UnknownHook { rule: String, hook: String },
}

/// Error raised while parsing a backend URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("'{0}' must use the http scheme")]
    Scheme(String),
    #[error("'{0}' has no host")]
    MissingHost(String),
    #[error("'{url}' is invalid: {reason}")]
    Invalid { url: String, reason: String },
    #[error(transparent)]
    Path(#[from] TemplateError),
}

/// Upstream location of a rule.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    pub scheme: Scheme,
    pub authority: Authority,
    /// Rewritten path. `None` forwards the inbound path unchanged.
    pub path: Option<PathTemplate>,
}

impl BackendTarget {
    /// Parse `http://host[:port][/path/{param}]`.
    ///
    /// Backends are reached in cleartext; TLS origination is not supported.
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let rest = url
            .strip_prefix("http://")
            .ok_or_else(|| TargetError::Scheme(url.to_string()))?;
        if rest.contains('?') || rest.contains('#') {
            return Err(TargetError::Invalid {
                url: url.to_string(),
                reason: "query and fragment are not allowed".to_string(),
            });
        }

        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(TargetError::MissingHost(url.to_string()));
        }
        let authority: Authority = authority.parse().map_err(|e: axum::http::uri::InvalidUri| {
            TargetError::Invalid {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let path = if path.trim_matches('/').is_empty() {
            None
        } else {
            Some(PathTemplate::parse(path)?)
        };

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
            path,
        })
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)?;
        if let Some(path) = &self.path {
            write!(f, "{}", path.as_str())?;
        }
        Ok(())
    }
}

/// A compiled rule.
#[derive(Debug)]
pub struct Rule {
    pub name: String,
    /// Lowercased host without port.
    pub host: Option<String>,
    /// Allowed methods; empty accepts any.
    pub methods: Vec<Method>,
    pub path: PathTemplate,
    pub backend: BackendTarget,
    pub protocol: Protocol,
    pub hooks: HookPipeline,
}

impl Rule {
    /// Compile a rule and resolve its hooks against `registry`.
    pub fn from_config(config: &RuleConfig, registry: &HookRegistry) -> Result<Self, RuleSetError> {
        let hooks = registry
            .resolve(&config.hooks)
            .map_err(|hook| RuleSetError::UnknownHook {
                rule: config.name.clone(),
                hook,
            })?;
        Self::compile(config, hooks)
    }

    /// Compile a rule with an already resolved hook pipeline.
    pub fn compile(config: &RuleConfig, hooks: HookPipeline) -> Result<Self, RuleSetError> {
        let name = config.name.clone();

        let path = PathTemplate::parse(&config.frontend.path).map_err(|source| {
            RuleSetError::Template {
                rule: name.clone(),
                source,
            }
        })?;

        let methods = config
            .frontend
            .methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
                    RuleSetError::Method {
                        rule: name.clone(),
                        method: m.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let backend = BackendTarget::parse(&config.backend.url).map_err(|source| {
            RuleSetError::Backend {
                rule: name.clone(),
                source,
            }
        })?;

        if let Some(backend_path) = &backend.path {
            let captured: Vec<&str> = path.param_names().collect();
            if let Some(param) = backend_path.param_names().find(|p| !captured.contains(p)) {
                return Err(RuleSetError::UnboundParam {
                    rule: name,
                    param: param.to_string(),
                });
            }
        }

        let host = config
            .frontend
            .host
            .as_deref()
            .map(|h| strip_port(h).to_ascii_lowercase());

        Ok(Self {
            name,
            host,
            methods,
            path,
            backend,
            protocol: config.backend.protocol,
            hooks,
        })
    }

    /// Returns true if the rule accepts this method.
    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Returns true if the rule accepts this host. Rules without a host accept any.
    pub fn matches_host(&self, host: Option<&str>) -> bool {
        match (&self.host, host) {
            (None, _) => true,
            (Some(expected), Some(actual)) => strip_port(actual).eq_ignore_ascii_case(expected),
            (Some(_), None) => false,
        }
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals keep their colons.
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.split(':').next().unwrap_or(host)
}
