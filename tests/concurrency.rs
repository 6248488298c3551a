//! Parallel requests share rules, hooks and pools but never each other's state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode};
use futures_util::future::{join_all, BoxFuture};

use authz_gateway::config::{GatewayConfig, Protocol};
use authz_gateway::hooks::{Hook, HookContext, HookError, HookRegistry};

mod common;

const PARALLEL: usize = 64;

/// Copies the request's own params and body length onto the response.
struct EchoContextHook {
    calls: Arc<AtomicUsize>,
}

impl Hook for EchoContextHook {
    fn name(&self) -> &str {
        "echo-context"
    }

    fn serve<'a>(
        &'a self,
        ctx: &'a HookContext,
        mut response: Response<Body>,
    ) -> BoxFuture<'a, Result<Response<Body>, HookError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = match HeaderValue::from_str(ctx.params.get("id").unwrap_or("-")) {
                Ok(id) => id,
                Err(e) => return Err(HookError::new("echo-context", e.to_string())),
            };
            let headers = response.headers_mut();
            headers.insert("x-hook-id", id);
            headers.insert("x-hook-body-len", HeaderValue::from(ctx.request_body.len()));
            Ok::<_, HookError>(response)
        })
    }
}

fn header(res: &reqwest::Response, name: &str) -> String {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_requests_keep_their_own_context() {
    let backend = common::start_echo_backend().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = HookRegistry::new();
    hooks.register(Arc::new(EchoContextHook {
        calls: calls.clone(),
    }));

    let mut projects =
        common::rule("projects", "/projects/{id}", &["POST"], &backend.url(), Protocol::Http);
    projects.hooks = vec!["echo-context".into()];
    let gateway = common::start_gateway(vec![projects.clone()], hooks).await;

    let client = reqwest::Client::new();
    let requests = (0..PARALLEL).map(|i| {
        let client = client.clone();
        let url = gateway.url(&format!("/projects/{}", i));
        // Distinct length per request so a mixed-up context is visible.
        let body = format!("payload-{}-{}", i, "x".repeat(i));
        tokio::spawn(async move {
            let res = client.post(url).body(body.clone()).send().await.unwrap();
            (i, body, res)
        })
    });
    let in_flight: Vec<_> = requests.collect();

    // Swap the rule set while requests are in flight; the project rule survives.
    let mut reloaded = GatewayConfig::default();
    reloaded.rules = vec![
        common::rule("health", "/healthz", &["GET"], &backend.url(), Protocol::Http),
        projects,
    ];
    gateway.updates.send(reloaded).unwrap();

    for joined in join_all(in_flight).await {
        let (i, body, res) = joined.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {}", i);
        assert_eq!(header(&res, "x-hook-id"), i.to_string());
        assert_eq!(header(&res, "x-hook-body-len"), body.len().to_string());
        assert_eq!(header(&res, "x-seen-path"), format!("/projects/{}", i));
        assert_eq!(res.text().await.unwrap(), body);
    }

    assert_eq!(calls.load(Ordering::SeqCst), PARALLEL);
    assert_eq!(backend.hits(), PARALLEL);
}
