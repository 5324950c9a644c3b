//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! Request cookies
//!     → demo.rs (non-production role simulation, if active)
//!     → session.rs (session cookie → verify → role lookup, time-bounded)
//!     → service.rs (HTTP calls to the identity service)
//!     → Identity { user_id, role } or None
//! ```
//!
//! # Design Decisions
//! - Identities are resolved per request and never cached here
//! - Identity service failures degrade to "anonymous", never to an error page

pub mod demo;
pub mod identity;
pub mod service;
pub mod session;

pub use demo::DemoModeOverride;
pub use identity::{Identity, Role, UnknownRole};
pub use service::{HttpIdentityService, IdentityError, IdentityService};
pub use session::SessionResolver;
