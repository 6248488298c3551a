//! Rule match middleware.
//! Resolves the rule for a request and enriches it with per-request state.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::http::middleware::MiddlewareInfo;
use crate::observability::metrics;
use crate::routing::RuleMatcher;

/// Registry entry for this middleware.
pub const INFO: MiddlewareInfo = MiddlewareInfo {
    name: "_rulematch",
    description: "match request with service rule set and enrich context",
};

/// The inbound body, read once and shared with every later stage.
#[derive(Debug, Clone, Default)]
pub struct BufferedBody(pub Bytes);

/// State required for rule matching.
#[derive(Clone)]
pub struct RuleMatchState {
    pub matcher: Arc<dyn RuleMatcher>,
    /// Upper bound for the buffered body.
    pub max_body_bytes: usize,
}

impl RuleMatchState {
    pub fn info(&self) -> MiddlewareInfo {
        INFO
    }
}

pub async fn rule_match_middleware(
    State(state): State<RuleMatchState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Find the rule
    let matched = match state.matcher.match_request(&req) {
        Ok(m) => m,
        Err(e) => {
            tracing::info!(
                path = %req.uri(),
                method = %req.method(),
                reason = e.reason(),
                error = %e,
                "middleware: failed to match rule"
            );
            metrics::record_match_failure(e.reason());
            return GatewayError::from(e).into_response();
        }
    };

    // 2. Buffer the body so hooks and the upstream both see it
    let (mut parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::info!(
                rule = %matched.rule.name,
                error = %e,
                "middleware: failed to enrich ctx with request body"
            );
            return GatewayError::BodyEnrichmentFailed(e).into_response();
        }
    };

    tracing::debug!(rule = %matched.rule.name, body_len = bytes.len(), "Rule matched");

    // 3. Attach context and restore the body
    parts.extensions.insert(matched);
    parts.extensions.insert(BufferedBody(bytes.clone()));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, FrontendConfig, Protocol, RuleConfig};
    use crate::hooks::HookRegistry;
    use crate::routing::{MatchError, MatchResult, RuleSet};
    use axum::{http::StatusCode, middleware, routing::any, Extension, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Faulty;

    impl RuleMatcher for Faulty {
        fn match_request(&self, _req: &Request<Body>) -> Result<MatchResult, MatchError> {
            Err(MatchError::Fault("rule index unavailable".into()))
        }
    }

    fn rules() -> Arc<dyn RuleMatcher> {
        let config = RuleConfig {
            name: "project".into(),
            frontend: FrontendConfig {
                path: "/projects/{id}".into(),
                methods: Vec::new(),
                host: None,
            },
            backend: BackendConfig {
                url: "http://projects-svc:8080".into(),
                protocol: Protocol::Http,
            },
            hooks: Vec::new(),
        };
        Arc::new(RuleSet::build(&[config], &HookRegistry::new()).unwrap())
    }

    /// Echoes what the downstream handler observed.
    fn app(matcher: Arc<dyn RuleMatcher>, max_body_bytes: usize, hits: Arc<AtomicUsize>) -> Router {
        let state = RuleMatchState { matcher, max_body_bytes };
        Router::new()
            .route(
                "/{*path}",
                any(
                    move |Extension(m): Extension<MatchResult>,
                          Extension(buffered): Extension<BufferedBody>,
                          body: Bytes| {
                        let hits = hits.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            assert_eq!(buffered.0, body);
                            format!(
                                "{}:{}:{}",
                                m.rule.name,
                                m.params.get("id").unwrap_or("-"),
                                String::from_utf8_lossy(&body)
                            )
                        }
                    },
                ),
            )
            .layer(middleware::from_fn_with_state(state, rule_match_middleware))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_match_enriches_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(rules(), 1024, hits.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/projects/42")
                    .body(Body::from(r#"{"name":"gateway"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"project:42:{"name":"gateway"}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_client_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(rules(), 1024, hits.clone())
            .oneshot(Request::builder().uri("/groups/1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hits.load(Ordering::SeqCst), 0, "downstream must not run");
    }

    #[tokio::test]
    async fn test_matcher_fault_is_server_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(Arc::new(Faulty), 1024, hits.clone())
            .oneshot(Request::builder().uri("/projects/1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_body_read_failure_stops_request() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(rules(), 4, hits.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/projects/1")
                    .body(Body::from("more than four bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_info() {
        let state = RuleMatchState { matcher: rules(), max_body_bytes: 1 };
        assert_eq!(state.info().name, "_rulematch");
        assert!(!state.info().description.is_empty());
    }
}
