//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Upstream connection pool settings.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Rule definitions mapping requests to backends.
    pub rules: Vec<RuleConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body the enrichment middleware will buffer.
    pub max_body_bytes: usize,

    /// Overall request timeout in seconds. 0 disables it, which keeps
    /// long-lived gRPC streams alive.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 4 * 1024 * 1024, // 4MB
            request_timeout_secs: 0,
        }
    }
}

/// Settings shared by both upstream connection pools.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP connect timeout in seconds.
    pub dial_timeout_secs: u64,

    /// TCP keep-alive interval in seconds.
    pub keep_alive_secs: u64,

    /// How long an idle pooled connection may be reused, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle connections kept per upstream host.
    pub max_idle_per_host: usize,
}

impl TransportConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: 10,
            keep_alive_secs: 60,
            pool_idle_timeout_secs: 60,
            max_idle_per_host: 32,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Wire protocol a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// HTTP/1.1.
    #[default]
    Http,
    /// HTTP/2 over plaintext with prior knowledge.
    H2c,
    /// gRPC over cleartext HTTP/2.
    Grpc,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::H2c => write!(f, "h2c"),
            Protocol::Grpc => write!(f, "grpc"),
        }
    }
}

/// A single proxy rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Rule identifier for logging/metrics.
    pub name: String,

    /// Shape of the inbound requests this rule accepts.
    pub frontend: FrontendConfig,

    /// Where matching requests are forwarded.
    pub backend: BackendConfig,

    /// Hook names, run in order on the upstream response.
    #[serde(default)]
    pub hooks: Vec<String>,
}

/// Inbound side of a rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrontendConfig {
    /// Path template, e.g. `/projects/{id}` or `/static/{rest*}`.
    pub path: String,

    /// Allowed methods. Empty accepts any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Host to match (case-insensitive, port ignored).
    #[serde(default)]
    pub host: Option<String>,
}

/// Upstream side of a rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Target URL. The path may reuse frontend parameters, e.g.
    /// `http://projects-svc:8080/v1/projects/{id}`. Without a path the
    /// inbound path is forwarded as is.
    pub url: String,

    /// Protocol family the backend speaks.
    #[serde(default)]
    pub protocol: Protocol,
}
