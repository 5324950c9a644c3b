pub mod gatekeeper;

pub use gatekeeper::{gatekeeper_middleware, protect};
