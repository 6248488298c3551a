//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (HTTP/1.1 or h2c prior knowledge)
//!     → server.rs (Axum setup, request ID, trace)
//!     → middleware/rule_match.rs (match rule, buffer body, enrich extensions)
//!     → server.rs proxy handler (build hook context)
//!     → director.rs (rewrite into the backend request, or Unroutable)
//!     → transport (round trip + hooks)
//!     → Send to client
//! ```

pub mod director;
pub mod middleware;
pub mod request;
pub mod server;

pub use director::{direct, ForwardError, Outbound};
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer};
