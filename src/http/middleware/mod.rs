//! Request middlewares.

pub mod rule_match;

pub use rule_match::{rule_match_middleware, BufferedBody, RuleMatchState};

/// Self-description of a middleware, for registries and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiddlewareInfo {
    pub name: &'static str,
    pub description: &'static str,
}
