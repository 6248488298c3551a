//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host, path)
//!     → router.rs (rule lookup against the live rule set)
//!     → rule.rs (method/host filter), template.rs (path match + params)
//!     → Return: MatchResult or MatchError
//!
//! Rule Compilation (at startup and on reload):
//!     RuleConfig[]
//!     → Parse templates and backend targets, resolve hooks
//!     → Sort by literal prefix length
//!     → Freeze as immutable RuleSet
//! ```
//!
//! # Design Decisions
//! - Rules compiled ahead of time, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same rule

pub mod matcher;
pub mod router;
pub mod rule;
pub mod template;

pub use matcher::{MatchError, MatchResult, RuleMatcher};
pub use router::{LiveRules, RuleSet};
pub use rule::{BackendTarget, Rule, RuleSetError};
pub use template::{PathParams, PathTemplate};
