//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (identity credentials, demo flag, deployment tier)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!     → ConfigState derived once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Missing identity credentials are a valid state, not a load error

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DemoConfig, DeploymentTier, GatekeeperConfig, IdentityConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RoutingConfig, UnknownTier, UpstreamConfig,
};

/// Credentials needed to reach the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEndpoint {
    pub url: String,
    pub public_key: String,
}

/// Whether authentication can run at all.
///
/// `Missing` turns the gatekeeper into a rate limiter only: every access
/// decision after throttling is `Continue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigState {
    Configured(IdentityEndpoint),
    Missing,
}

impl ConfigState {
    pub fn is_configured(&self) -> bool {
        matches!(self, ConfigState::Configured(_))
    }
}

impl IdentityConfig {
    /// Both URL and key must be present and non-blank.
    pub fn state(&self) -> ConfigState {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match (present(&self.url), present(&self.public_key)) {
            (Some(url), Some(public_key)) => ConfigState::Configured(IdentityEndpoint {
                url: url.trim_end_matches('/').to_string(),
                public_key,
            }),
            _ => ConfigState::Missing,
        }
    }
}
