//! Upstream connection pools.
//!
//! # Responsibilities
//! - Own the two long-lived clients (general, cleartext HTTP/2)
//! - Decide which one serves a request
//!
//! # Design Decisions
//! - Built once at startup and dropped with the server
//! - Both pools share dial timeout, TCP keep-alive and idle reuse window
//! - Compression is never negotiated by the pools

use axum::body::Body;
use axum::http::{header, HeaderMap, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::{Protocol, TransportConfig};

/// Client type of both pools.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// gRPC media type.
pub const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// Which pool carries a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// HTTP/1.1 keep-alive pool.
    General,
    /// HTTP/2 with prior knowledge over plaintext TCP.
    CleartextH2,
}

impl PoolKind {
    /// Pick the pool for a request to a backend speaking `protocol`.
    ///
    /// gRPC content always needs cleartext HTTP/2; rules declaring `h2c`
    /// opt into it for every content type.
    pub fn select(protocol: Protocol, headers: &HeaderMap) -> Self {
        if protocol == Protocol::H2c || is_grpc(headers) {
            PoolKind::CleartextH2
        } else {
            PoolKind::General
        }
    }

    /// HTTP version spoken on this pool.
    pub fn version(self) -> Version {
        match self {
            PoolKind::General => Version::HTTP_11,
            PoolKind::CleartextH2 => Version::HTTP_2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolKind::General => "general",
            PoolKind::CleartextH2 => "h2c",
        }
    }
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if the content type is `application/grpc` or one of its
/// `application/grpc+<codec>` variants. Parameters are ignored.
pub fn is_grpc(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let essence = v.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case(GRPC_CONTENT_TYPE)
                || essence
                    .get(..GRPC_CONTENT_TYPE.len() + 1)
                    .map(|prefix| prefix.eq_ignore_ascii_case("application/grpc+"))
                    .unwrap_or(false)
        })
        .unwrap_or(false)
}

/// The two upstream pools.
#[derive(Clone)]
pub struct TransportPools {
    general: UpstreamClient,
    cleartext_h2: UpstreamClient,
}

impl TransportPools {
    /// Build both pools. Must be called inside a Tokio runtime.
    pub fn new(config: &TransportConfig) -> Self {
        let general = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build(connector(config));

        let cleartext_h2 = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .http2_only(true)
            .build(connector(config));

        tracing::info!(
            dial_timeout_secs = config.dial_timeout_secs,
            keep_alive_secs = config.keep_alive_secs,
            pool_idle_timeout_secs = config.pool_idle_timeout_secs,
            "Upstream pools ready"
        );

        Self {
            general,
            cleartext_h2,
        }
    }

    pub fn get(&self, kind: PoolKind) -> &UpstreamClient {
        match kind {
            PoolKind::General => &self.general,
            PoolKind::CleartextH2 => &self.cleartext_h2,
        }
    }
}

fn connector(config: &TransportConfig) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(config.dial_timeout()));
    connector.set_keepalive(Some(config.keep_alive()));
    connector.set_nodelay(true);
    connector
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn select(protocol: Protocol, content_type: &str) -> PoolKind {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        PoolKind::select(protocol, &headers)
    }

    #[test]
    fn test_grpc_content_type_selects_cleartext_h2() {
        assert_eq!(select(Protocol::Grpc, "application/grpc"), PoolKind::CleartextH2);
        assert_eq!(select(Protocol::Http, "application/grpc"), PoolKind::CleartextH2);
        assert_eq!(select(Protocol::Grpc, "application/grpc+proto"), PoolKind::CleartextH2);
        assert_eq!(
            select(Protocol::Grpc, "Application/GRPC; charset=utf-8"),
            PoolKind::CleartextH2
        );
    }

    #[test]
    fn test_other_content_types_use_general_pool() {
        assert_eq!(select(Protocol::Http, "application/json"), PoolKind::General);
        assert_eq!(select(Protocol::Grpc, "application/json"), PoolKind::General);
        assert_eq!(select(Protocol::Http, "application/grpc-web"), PoolKind::General);
        assert_eq!(select(Protocol::Http, "application/grpcx"), PoolKind::General);
        assert_eq!(PoolKind::select(Protocol::Http, &HeaderMap::new()), PoolKind::General);
    }

    #[test]
    fn test_h2c_rules_force_cleartext_pool() {
        assert_eq!(select(Protocol::H2c, "application/json"), PoolKind::CleartextH2);
        assert_eq!(PoolKind::CleartextH2.version(), Version::HTTP_2);
        assert_eq!(PoolKind::General.version(), Version::HTTP_11);
    }

    #[tokio::test]
    async fn test_pools_build_inside_runtime() {
        let pools = TransportPools::new(&TransportConfig::default());
        let cloned = pools.clone();
        let _ = cloned.get(PoolKind::General);
        let _ = cloned.get(PoolKind::CleartextH2);
    }
}
