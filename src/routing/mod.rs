//! Routing subsystem: who may see which path family.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → matcher.rs (canonical form, excluded? protected tree / auth-entry / public)
//!     → router.rs (RequestFacts → Decision { routing, reason })
//!
//! Decision table (after rate limiting, only when identity is configured):
//!     protected + anonymous      → /login?redirect=<path>
//!     protected + other role     → /<role>/dashboard
//!     protected + same role      → continue
//!     auth-entry + authenticated → /<role>/dashboard
//!     anything else              → continue
//!
//! A demo role, when present, is the identity for this table.
//! ```
//!
//! # Design Decisions
//! - Path rules compiled at startup, immutable at runtime
//! - The decision is a pure function; no I/O, no response objects

pub mod matcher;
pub mod router;

pub use matcher::{CanonicalPath, PathClass, PathError, PathRules};
pub use router::{decide, Decision, Reason, RequestFacts, RoutingDecision};
