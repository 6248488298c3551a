//! Reference rule set.
//!
//! # Responsibilities
//! - Store compiled rules
//! - Look up the most specific rule for a request
//! - Swap in a rebuilt rule set on config reload
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules sorted once by literal prefix length; a stable sort keeps
//!   declaration order for ties, so the first hit is the winner
//! - O(n) scan (acceptable for typical rule counts)

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;

use crate::config::RuleConfig;
use crate::hooks::HookRegistry;
use crate::routing::matcher::{request_host, MatchError, MatchResult, RuleMatcher};
use crate::routing::rule::{Rule, RuleSetError};

/// An immutable, ordered collection of rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Arc<Rule>>,
}

impl RuleSet {
    /// Compile every rule, resolving hooks against `hooks`.
    pub fn build(configs: &[RuleConfig], hooks: &HookRegistry) -> Result<Self, RuleSetError> {
        let rules = configs
            .iter()
            .map(|config| Rule::from_config(config, hooks))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rules(rules))
    }

    /// Build from already compiled rules, given in declaration order.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let mut rules: Vec<Arc<Rule>> = rules.into_iter().map(Arc::new).collect();
        rules.sort_by(|a, b| b.path.literal_prefix_len().cmp(&a.path.literal_prefix_len()));
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in match order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }
}

impl RuleMatcher for RuleSet {
    fn match_request(&self, req: &Request<Body>) -> Result<MatchResult, MatchError> {
        let host = request_host(req);
        let path = req.uri().path();

        self.rules
            .iter()
            .filter(|rule| rule.allows_method(req.method()) && rule.matches_host(host))
            .find_map(|rule| {
                rule.path.matches(path).map(|params| MatchResult {
                    rule: Arc::clone(rule),
                    params,
                })
            })
            .ok_or_else(|| MatchError::NotFound {
                method: req.method().clone(),
                path: path.to_string(),
            })
    }
}

/// A rule set that can be replaced while requests are in flight.
///
/// Each match works on the snapshot loaded at its start.
#[derive(Debug)]
pub struct LiveRules {
    current: ArcSwap<RuleSet>,
}

impl LiveRules {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(rules),
        }
    }

    /// Atomically replace the active rule set.
    pub fn replace(&self, rules: RuleSet) {
        self.current.store(Arc::new(rules));
    }

    /// The active rule set.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }
}

impl RuleMatcher for LiveRules {
    fn match_request(&self, req: &Request<Body>) -> Result<MatchResult, MatchError> {
        self.current.load().match_request(req)
    }
}
