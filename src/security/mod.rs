//! Security subsystem: abuse throttling on authentication endpoints.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → sensitive.rs (is the path a throttled auth endpoint?)
//!     → client_ip.rs (who is asking? proxy headers, else "unknown")
//!     → rate_limit.rs (fixed window check, "<scope>:<client>")
//!     → store.rs (per-instance counters, swept lazily and periodically)
//! ```
//!
//! # Design Decisions
//! - Runs before identity resolution; a denied request never reaches the
//!   identity service
//! - Paths outside the throttled set never touch the store
//! - Counters are per instance; see `store` for the multi-instance caveat

pub mod client_ip;
pub mod rate_limit;
pub mod sensitive;
pub mod store;

pub use client_ip::client_identifier;
pub use rate_limit::{RateLimitOutcome, RateLimiter};
pub use sensitive::SensitiveEndpointMatcher;
pub use store::{InMemoryStore, RateLimitEntry, RateLimitStore};
