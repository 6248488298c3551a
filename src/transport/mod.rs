//! Upstream transport subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound (from the director)
//!     → Unroutable: return the forwarding error, no I/O
//!     → Ready: strip Accept-Encoding
//!         → pool.rs (PoolKind: general HTTP/1.1 or cleartext HTTP/2)
//!         → round trip on the selected client
//!         → network error: returned unchanged, hooks skipped
//!         → response: hook pipeline of the matched rule, once
//! ```
//!
//! # Design Decisions
//! - No retries here; a wrapping layer owns retry policy
//! - Pools are explicit objects passed in at construction, never globals

pub mod pool;
pub mod round_trip;

pub use pool::{PoolKind, TransportPools, GRPC_CONTENT_TYPE};
pub use round_trip::Transport;
