//! The single round-trip operation used by the proxy handler.

use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Response};
use hyper::body::Incoming;

use crate::error::GatewayError;
use crate::hooks::HookContext;
use crate::http::director::Outbound;
use crate::observability::metrics;
use crate::transport::pool::{PoolKind, TransportPools};

/// Protocol-aware transport over the two upstream pools.
#[derive(Clone)]
pub struct Transport {
    pools: TransportPools,
}

impl Transport {
    pub fn new(pools: TransportPools) -> Self {
        Self { pools }
    }

    /// Send the outbound request and pass the response through the rule's hooks.
    ///
    /// - `Outbound::Unroutable` returns its error without touching the network
    /// - network failures are returned as is and skip the hooks
    /// - hooks run exactly once on success; their result is the final result
    pub async fn round_trip(
        &self,
        outbound: Outbound,
        ctx: &HookContext,
    ) -> Result<Response<Body>, GatewayError> {
        let mut request = match outbound {
            Outbound::Ready(request) => request,
            Outbound::Unroutable(e) => return Err(GatewayError::Preflight(e)),
        };

        // The backend must not compress; hooks may need the plain body.
        request.headers_mut().remove(header::ACCEPT_ENCODING);

        let pool = PoolKind::select(ctx.rule.protocol, request.headers());
        *request.version_mut() = pool.version();

        tracing::debug!(
            rule = %ctx.rule.name,
            host = request.uri().authority().map(|a| a.as_str()).unwrap_or_default(),
            path = request.uri().path(),
            scheme = request.uri().scheme_str().unwrap_or_default(),
            protocol = ?request.version(),
            pool = %pool,
            "proxy request"
        );

        let started = Instant::now();
        let response: Response<Incoming> = match self.pools.get(pool).request(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream(pool, None, started);
                return Err(GatewayError::Transport(e));
            }
        };
        metrics::record_upstream(pool, Some(response.status()), started);

        let response = response.map(Body::new);
        ctx.rule
            .hooks
            .serve(ctx, response)
            .await
            .map_err(GatewayError::Hook)
    }
}
