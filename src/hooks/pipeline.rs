//! Ordered hook execution.

use axum::body::Body;
use axum::http::Response;
use std::sync::Arc;

use crate::hooks::{Hook, HookContext, HookError};
use crate::observability::metrics;

/// The resolved hooks of one rule.
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookPipeline {
    pub fn new(hooks: Vec<Arc<dyn Hook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every hook in order, feeding each the previous output.
    /// The first error stops the chain.
    pub async fn serve(
        &self,
        ctx: &HookContext,
        mut response: Response<Body>,
    ) -> Result<Response<Body>, HookError> {
        for hook in &self.hooks {
            response = match hook.serve(ctx, response).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        rule = %ctx.rule.name,
                        hook = hook.name(),
                        error = %e,
                        "Hook failed"
                    );
                    metrics::record_hook_failure(hook.name());
                    return Err(e);
                }
            };
        }
        Ok(response)
    }
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
