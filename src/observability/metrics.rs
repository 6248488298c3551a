//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): upstream round trips by pool, status
//! - `gateway_upstream_duration_seconds` (histogram): round-trip latency by pool
//! - `gateway_match_failures_total` (counter): unmatched requests by reason
//! - `gateway_hook_failures_total` (counter): hook errors by hook name
//! - `gateway_rules_loaded` (gauge): size of the live rule set
//!
//! Network failures are recorded with status `error`.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::transport::PoolKind;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one upstream round trip.
pub fn record_upstream(pool: PoolKind, status: Option<StatusCode>, started: Instant) {
    let status = status
        .map(|s| s.as_u16().to_string())
        .unwrap_or_else(|| "error".to_string());
    counter!("gateway_requests_total", "pool" => pool.as_str(), "status" => status).increment(1);
    histogram!("gateway_upstream_duration_seconds", "pool" => pool.as_str())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_match_failure(reason: &'static str) {
    counter!("gateway_match_failures_total", "reason" => reason).increment(1);
}

pub fn record_hook_failure(hook: &str) {
    counter!("gateway_hook_failures_total", "hook" => hook.to_string()).increment(1);
}

pub fn record_rules_loaded(count: usize) {
    gauge!("gateway_rules_loaded").set(count as f64);
}
