//! Edge request gatekeeper.
//!
//! Runs in front of an application and enforces two policies on every
//! request: throttling of authentication endpoints, and identity plus
//! role-based routing for the protected athlete, brand and director areas.

pub mod auth;
pub mod config;
pub mod gatekeeper;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatekeeperConfig;
pub use gatekeeper::{Evaluation, Gatekeeper};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
