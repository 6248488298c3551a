//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the proxy handler
//! - Accept HTTP/1.1 and cleartext HTTP/2 (prior knowledge) on one port
//! - Wire up middleware (request ID, tracing, rule match, optional timeout)
//! - Swap the rule set when the watcher delivers a new config
//! - Hand matched requests to the director and the transport

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, ListenerConfig};
use crate::error::GatewayError;
use crate::hooks::{HookContext, HookRegistry};
use crate::http::director;
use crate::http::middleware::{rule_match_middleware, BufferedBody, RuleMatchState};
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::{LiveRules, MatchResult, RuleMatcher, RuleSet, RuleSetError};
use crate::transport::{Transport, TransportPools};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<Transport>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    rules: Arc<LiveRules>,
    hooks: Arc<HookRegistry>,
}

impl HttpServer {
    /// Create a server for `config`, resolving rule hooks from `hooks`.
    pub fn new(config: GatewayConfig, hooks: HookRegistry) -> Result<Self, RuleSetError> {
        let rule_set = RuleSet::build(&config.rules, &hooks)?;
        tracing::info!(rules = rule_set.len(), hooks = hooks.len(), "Rule set compiled");
        metrics::record_rules_loaded(rule_set.len());

        let rules = Arc::new(LiveRules::new(rule_set));
        let transport = Arc::new(Transport::new(TransportPools::new(&config.transport)));
        let router = build_router(&config.listener, rules.clone(), transport);

        Ok(Self {
            router,
            config,
            rules,
            hooks: Arc::new(hooks),
        })
    }

    /// Run the server until `shutdown` fires, applying rule updates from
    /// `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload = tokio::spawn(apply_rule_updates(
            self.rules.clone(),
            self.hooks.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        reload.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Live rule set served by this server.
    pub fn rules(&self) -> Arc<LiveRules> {
        self.rules.clone()
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(
    listener: &ListenerConfig,
    matcher: Arc<dyn RuleMatcher>,
    transport: Arc<Transport>,
) -> Router {
    let rule_match = RuleMatchState {
        matcher,
        max_body_bytes: listener.max_body_bytes,
    };

    let router = Router::new()
        .route("/", any(proxy_handler))
        .route("/{*path}", any(proxy_handler))
        .with_state(AppState { transport })
        .layer(middleware::from_fn_with_state(rule_match, rule_match_middleware));

    let router = if listener.request_timeout_secs > 0 {
        router.layer(TimeoutLayer::new(Duration::from_secs(listener.request_timeout_secs)))
    } else {
        router
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
    )
}

async fn apply_rule_updates(
    rules: Arc<LiveRules>,
    hooks: Arc<HookRegistry>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match RuleSet::build(&config.rules, &hooks) {
                    Ok(rule_set) => {
                        let count = rule_set.len();
                        rules.replace(rule_set);
                        metrics::record_rules_loaded(count);
                        tracing::info!(rules = count, "Rule set reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected reloaded rules, keeping current set");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Forward a matched request and return the hook-processed response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();

    let Some(matched) = request.extensions().get::<MatchResult>().cloned() else {
        return GatewayError::MissingContext("matched rule").into_response();
    };
    let Some(BufferedBody(body)) = request.extensions().get::<BufferedBody>().cloned() else {
        return GatewayError::MissingContext("request body").into_response();
    };

    let ctx = HookContext {
        rule: matched.rule.clone(),
        params: matched.params.clone(),
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        request_body: body,
    };

    let outbound = director::direct(request, &matched);
    match state.transport.round_trip(outbound, &ctx).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                rule = %ctx.rule.name,
                status = e.status().as_u16(),
                error = %e,
                "Proxy request failed"
            );
            e.into_response()
        }
    }
}
