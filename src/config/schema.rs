//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration for the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Application the gatekeeper forwards allowed requests to.
    pub upstream: UpstreamConfig,

    /// Throttling of authentication-sensitive endpoints.
    pub rate_limit: RateLimitConfig,

    /// Path families: throttled, auth-entry, excluded.
    pub routing: RoutingConfig,

    /// External identity service settings.
    pub identity: IdentityConfig,

    /// Non-production role simulation.
    pub demo: DemoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one request, including the upstream round-trip.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Key prefix for counters in the store.
    pub scope: String,

    /// Chance that a throttled request triggers a sweep of expired entries.
    pub sweep_probability: f64,

    /// Interval of the background sweep in seconds (0 disables it).
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_ms: 60_000,
            scope: "auth".to_string(),
            sweep_probability: 0.01,
            sweep_interval_secs: 60,
        }
    }
}

/// Path families used by the matcher and the access router.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Endpoints subject to rate limiting (nested paths included).
    pub sensitive_paths: Vec<String>,

    /// Pages an authenticated user is bounced away from.
    pub auth_entry_paths: Vec<String>,

    /// Where anonymous users are sent from protected trees.
    pub login_path: String,

    /// Path prefixes the gatekeeper never inspects.
    pub excluded_prefixes: Vec<String>,

    /// File extensions the gatekeeper never inspects (without the dot).
    pub excluded_extensions: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            sensitive_paths: vec![
                "/login".to_string(),
                "/signup".to_string(),
                "/forgot-password".to_string(),
                "/reset-password".to_string(),
            ],
            auth_entry_paths: vec!["/login".to_string(), "/signup".to_string()],
            login_path: "/login".to_string(),
            excluded_prefixes: vec![
                "/_next/static".to_string(),
                "/_next/image".to_string(),
                "/static/".to_string(),
                "/favicon.ico".to_string(),
            ],
            excluded_extensions: ["svg", "png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Identity service configuration.
///
/// `url` and `public_key` are both required for authentication to run; when
/// either is missing the gatekeeper only rate limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL of the identity service.
    pub url: Option<String>,

    /// Public (anon) key sent with every identity call.
    pub public_key: Option<String>,

    /// Cookie carrying the session access token.
    pub session_cookie: String,

    /// Path of the session verification endpoint.
    pub user_endpoint: String,

    /// Path of the stored-role lookup endpoint.
    pub role_endpoint: String,

    /// Upper bound on each identity round-trip in milliseconds.
    pub timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: None,
            public_key: None,
            session_cookie: "session".to_string(),
            user_endpoint: "/auth/v1/user".to_string(),
            role_endpoint: "/rest/v1/profiles".to_string(),
            timeout_ms: 3_000,
        }
    }
}

/// Deployment tier. Demo mode never activates in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTier {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown deployment tier '{0}'")]
pub struct UnknownTier(pub String);

impl std::str::FromStr for DeploymentTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" | "preview" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// Demo mode configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Explicit opt-in flag.
    pub enabled: bool,

    /// Cookie naming the simulated role.
    pub cookie: String,

    /// Tier this instance is deployed to.
    pub tier: DeploymentTier,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cookie: "demo_role".to_string(),
            tier: DeploymentTier::Development,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
