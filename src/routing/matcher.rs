//! Rule matching contract.
//!
//! # Responsibilities
//! - Resolve the single rule that handles a request
//! - Report "no rule" separately from "matcher broke"
//!
//! # Design Decisions
//! - `&self` only: implementations are read concurrently without locks
//! - The result carries an `Arc<Rule>` so later stages never re-match

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};

use crate::routing::rule::Rule;
use crate::routing::template::PathParams;

/// Trait for resolving the rule that handles a request.
pub trait RuleMatcher: Send + Sync {
    /// Returns the matched rule and captured path parameters.
    fn match_request(&self, req: &Request<Body>) -> Result<MatchResult, MatchError>;
}

/// A rule resolved for one request, stored in the request extensions.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub rule: Arc<Rule>,
    pub params: PathParams,
}

/// Why matching failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MatchError {
    /// No rule accepts this request. Caused by the client.
    #[error("undefined proxy rule for {method} {path}")]
    NotFound { method: Method, path: String },
    /// The matcher itself failed.
    #[error("rule matcher fault: {0}")]
    Fault(String),
}

impl MatchError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            MatchError::NotFound { .. } => "not_found",
            MatchError::Fault(_) => "fault",
        }
    }
}

/// Host the request was addressed to: the URI authority for HTTP/2, the
/// `Host` header otherwise.
pub fn request_host<B>(req: &Request<B>) -> Option<&str> {
    req.uri().host().or_else(|| {
        req.headers()
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
    })
}
