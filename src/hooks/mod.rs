//! Response hooks.
//!
//! # Data Flow
//! ```text
//! Upstream response (round trip succeeded)
//!     → pipeline.rs (hooks of the matched rule, in declared order)
//!     → each hook: Response → Result<Response, HookError>
//!     → final response or the first hook error
//! ```
//!
//! # Design Decisions
//! - Hooks are registered by name (registry.rs) and resolved once per rule set
//! - The gateway ships no hook bodies; embedders register their own
//! - Hooks see the request through `HookContext`, never through shared state

pub mod pipeline;
pub mod registry;

use axum::body::{Body, Bytes};
use axum::http::{Method, Response};
use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::routing::{PathParams, Rule};

pub use pipeline::HookPipeline;
pub use registry::HookRegistry;

/// A post-processing step applied to upstream responses.
pub trait Hook: Send + Sync {
    /// Name used to reference the hook from rules.
    fn name(&self) -> &str;

    /// Transform the response or fail the request.
    fn serve<'a>(
        &'a self,
        ctx: &'a HookContext,
        response: Response<Body>,
    ) -> BoxFuture<'a, Result<Response<Body>, HookError>>;
}

/// What a hook knows about the request that produced the response.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub rule: Arc<Rule>,
    pub params: PathParams,
    pub method: Method,
    pub path: String,
    /// The buffered inbound body.
    pub request_body: Bytes,
}

/// Error returned by a hook. Ends the pipeline.
#[derive(Debug, thiserror::Error)]
#[error("hook '{hook}' failed: {message}")]
pub struct HookError {
    pub hook: String,
    pub message: String,
}

impl HookError {
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }
}
