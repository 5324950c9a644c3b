//! Per-request orchestration.
//!
//! # Data Flow
//! ```text
//! canonical path, headers
//!     → SensitiveEndpointMatcher ─ yes → ClientIdentifier → RateLimiter
//!     → denied? stop (identity service never called)
//!     → ConfigState::Missing? stop (continue unmodified)
//!     → path needs identity? DemoModeOverride, else SessionResolver
//!     → routing::decide
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{DemoModeOverride, HttpIdentityService, IdentityService, SessionResolver};
use crate::config::{ConfigState, GatekeeperConfig};
use crate::observability::metrics;
use crate::routing::matcher::canonical_config_path;
use crate::routing::{decide, CanonicalPath, Decision, PathRules, RequestFacts};
use crate::security::{
    client_identifier, InMemoryStore, RateLimitOutcome, RateLimitStore, RateLimiter,
    SensitiveEndpointMatcher,
};

/// Result of evaluating one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    /// Present only for throttled paths; drives the `X-RateLimit-*` headers.
    pub rate_limit: Option<RateLimitOutcome>,
}

/// The edge gatekeeper. Shared by all in-flight requests.
pub struct Gatekeeper {
    rules: PathRules,
    sensitive: SensitiveEndpointMatcher,
    limiter: RateLimiter,
    config_state: ConfigState,
    resolver: Option<SessionResolver>,
    demo: DemoModeOverride,
}

impl Gatekeeper {
    /// Build with an in-memory store and the HTTP identity client.
    pub fn from_config(config: &GatekeeperConfig) -> Self {
        let service = match config.identity.state() {
            ConfigState::Configured(endpoint) => Some(
                Arc::new(HttpIdentityService::new(endpoint, &config.identity)) as Arc<dyn IdentityService>,
            ),
            ConfigState::Missing => None,
        };
        Self::with_parts(config, Arc::new(InMemoryStore::new()), service)
    }

    /// Build from explicit collaborators.
    pub fn with_parts(
        config: &GatekeeperConfig,
        store: Arc<dyn RateLimitStore>,
        service: Option<Arc<dyn IdentityService>>,
    ) -> Self {
        let config_state = config.identity.state();
        let resolver = match (&config_state, service) {
            (ConfigState::Configured(_), Some(service)) => Some(SessionResolver::new(
                service,
                config.identity.session_cookie.clone(),
                Duration::from_millis(config.identity.timeout_ms),
            )),
            _ => None,
        };

        if !config_state.is_configured() {
            tracing::warn!("Identity service not configured; authentication and role routing are disabled");
        }
        let demo = DemoModeOverride::from_config(&config.demo);
        if demo.is_active() {
            tracing::warn!(tier = ?config.demo.tier, "Demo mode active; roles are taken from the demo cookie");
        }

        Self {
            rules: PathRules::from_config(&config.routing),
            sensitive: SensitiveEndpointMatcher::new(
                config.routing.sensitive_paths.iter().map(|p| canonical_config_path(p)),
            ),
            limiter: RateLimiter::new(&config.rate_limit, store),
            config_state,
            resolver,
            demo,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn config_state(&self) -> &ConfigState {
        &self.config_state
    }

    /// Paths the gatekeeper never looks at.
    pub fn is_excluded(&self, path: &CanonicalPath) -> bool {
        self.rules.is_excluded(path)
    }

    /// Evaluate one request.
    pub async fn evaluate(&self, path: &CanonicalPath, headers: &HeaderMap) -> Evaluation {
        let rate_limit = if self.sensitive.matches(path.as_str()) {
            let client = client_identifier(headers);
            let outcome = self.limiter.check(&client);
            if !outcome.is_allowed() {
                tracing::warn!(client = %client, path = %path, "Rate limit exceeded");
                metrics::record_rate_limited(self.limiter.scope());
            }
            Some(outcome)
        } else {
            None
        };

        let throttled = rate_limit.is_some_and(|o| !o.is_allowed());
        let mut demo_role = None;
        let mut identity = None;

        if !throttled && self.config_state.is_configured() && self.rules.classify(path).needs_identity() {
            let jar = CookieJar::from_headers(headers);
            demo_role = self.demo.simulated_role(&jar);
            if demo_role.is_none() {
                if let Some(resolver) = &self.resolver {
                    identity = resolver.resolve(&jar).await;
                }
            }
        }

        let facts = RequestFacts {
            path,
            rate_limit,
            config: &self.config_state,
            demo_role,
            identity: identity.as_ref(),
        };
        let decision = decide(&facts, &self.rules);

        tracing::debug!(
            path = %path,
            reason = decision.reason.as_str(),
            role = identity.as_ref().map(|i| i.role.as_str()).or(demo_role.map(|r| r.as_str())),
            "Gatekeeper decision"
        );
        metrics::record_decision(decision.reason.as_str());

        Evaluation { decision, rate_limit }
    }
}
