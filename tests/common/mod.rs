//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderValue, Request, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use authz_gateway::config::{BackendConfig, FrontendConfig, GatewayConfig, Protocol, RuleConfig};
use authz_gateway::hooks::HookRegistry;
use authz_gateway::lifecycle::Shutdown;
use authz_gateway::HttpServer;

/// A running mock backend.
pub struct Backend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl Backend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a backend that echoes the request body and reports what it saw in
/// `x-seen-*` response headers. Serves HTTP/1.1 and h2c prior knowledge.
pub async fn start_echo_backend() -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            echo(request).await
        }
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Backend { addr, hits }
}

async fn echo(request: Request<Body>) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let seen = |name: &str| {
        parts
            .headers
            .get(name)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("none"))
    };

    Response::builder()
        .status(200)
        .header("x-seen-version", format!("{:?}", parts.version))
        .header("x-seen-method", parts.method.as_str())
        .header("x-seen-path", parts.uri.path())
        .header("x-seen-query", parts.uri.query().unwrap_or("none"))
        .header("x-seen-accept-encoding", seen("accept-encoding"))
        .header("x-seen-forwarded-host", seen("x-forwarded-host"))
        .header("x-seen-request-id", seen("x-request-id"))
        .header("x-seen-connection", seen("connection"))
        .body(Body::from(body))
        .unwrap()
}

/// Start a listener that counts accepted connections and drops them.
pub async fn start_counting_listener() -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    Backend { addr, hits }
}

/// An address with nothing listening on it.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn rule(name: &str, path: &str, methods: &[&str], url: &str, protocol: Protocol) -> RuleConfig {
    RuleConfig {
        name: name.into(),
        frontend: FrontendConfig {
            path: path.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            host: None,
        },
        backend: BackendConfig {
            url: url.into(),
            protocol,
        },
        hooks: Vec::new(),
    }
}

/// A running gateway.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(rules: Vec<RuleConfig>, hooks: HookRegistry) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = GatewayConfig::default();
    config.listener.bind_address = addr.to_string();
    config.rules = rules;

    let shutdown = Shutdown::new();
    let (updates, update_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, hooks).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, update_rx, server_shutdown).await.unwrap();
    });

    Gateway {
        addr,
        shutdown,
        updates,
    }
}
