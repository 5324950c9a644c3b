//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, timeout)
//!     → middleware/gatekeeper.rs (evaluate, short-circuit or continue)
//!     → response.rs (redirect / 429 / rate-limit header decoration)
//!     → server.rs forwarder → upstream application
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{gatekeeper_middleware, protect};
pub use server::{HttpServer, ServerError};
