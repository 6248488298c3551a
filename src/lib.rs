//! Authorization gateway data plane.
//!
//! Matches each inbound request against a rule set, rewrites it for the
//! rule's backend, sends it over a protocol-aware pool and runs the rule's
//! response hooks before answering the client.
//!
//! ```text
//!  client ──▶ http::server ──▶ middleware::rule_match ──▶ http::director
//!                                   │ (routing)                 │
//!                                   ▼                           ▼
//!                              400 / 500                transport::round_trip
//!                                                          │ general | h2c pool
//!                                                          ▼
//!  client ◀──────── hooks::HookPipeline ◀──── backend response
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod transport;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use hooks::{Hook, HookContext, HookError, HookRegistry};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
