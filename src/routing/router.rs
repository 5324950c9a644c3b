//! Access routing decision.
//!
//! `decide` is a pure function of the facts gathered for one request. The
//! HTTP adapter in `http::middleware` turns the result into a response.

use axum::http::StatusCode;
use serde_json::json;

use crate::auth::{Identity, Role};
use crate::config::ConfigState;
use crate::routing::matcher::{CanonicalPath, PathClass, PathRules};
use crate::security::RateLimitOutcome;

/// Everything the decision depends on.
#[derive(Debug, Clone)]
pub struct RequestFacts<'a> {
    pub path: &'a CanonicalPath,
    /// Set only for throttled paths.
    pub rate_limit: Option<RateLimitOutcome>,
    pub config: &'a ConfigState,
    /// Role simulated by demo mode, if active.
    pub demo_role: Option<Role>,
    pub identity: Option<&'a Identity>,
}

/// What to do with the request.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    Continue,
    Redirect {
        target: String,
        query: Vec<(String, String)>,
    },
    Reject {
        status: StatusCode,
        body: serde_json::Value,
        headers: Vec<(&'static str, String)>,
    },
}

impl RoutingDecision {
    fn redirect(target: &str) -> Self {
        RoutingDecision::Redirect {
            target: target.to_string(),
            query: Vec::new(),
        }
    }

    /// Target with its query string encoded, e.g. `/login?redirect=%2Fbrand`.
    pub fn location(&self) -> Option<String> {
        match self {
            RoutingDecision::Redirect { target, query } if query.is_empty() => Some(target.clone()),
            RoutingDecision::Redirect { target, query } => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(query.iter())
                    .finish();
                Some(format!("{target}?{encoded}"))
            }
            _ => None,
        }
    }
}

/// Why a decision was taken. Used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    MalformedPath,
    RateLimitExceeded,
    ConfigurationMissing,
    SessionAbsentOrInvalid,
    RoleMismatch,
    AlreadyAuthenticated,
    DemoMode,
    Authorized,
    Public,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::MalformedPath => "malformed_path",
            Reason::RateLimitExceeded => "rate_limit_exceeded",
            Reason::ConfigurationMissing => "configuration_missing",
            Reason::SessionAbsentOrInvalid => "session_absent_or_invalid",
            Reason::RoleMismatch => "role_mismatch",
            Reason::AlreadyAuthenticated => "already_authenticated",
            Reason::DemoMode => "demo_mode",
            Reason::Authorized => "authorized",
            Reason::Public => "public",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub routing: RoutingDecision,
    pub reason: Reason,
}

impl Decision {
    fn new(routing: RoutingDecision, reason: Reason) -> Self {
        Self { routing, reason }
    }
}

/// Decide the fate of one request.
///
/// Order: rate limit, configuration, demo override, then the access table.
pub fn decide(facts: &RequestFacts<'_>, rules: &PathRules) -> Decision {
    if let Some(outcome) = facts.rate_limit {
        if let RateLimitOutcome::Denied { retry_after_secs, .. } = outcome {
            return Decision::new(too_many_requests(&outcome, retry_after_secs), Reason::RateLimitExceeded);
        }
    }

    if !facts.config.is_configured() {
        return Decision::new(RoutingDecision::Continue, Reason::ConfigurationMissing);
    }

    let class = rules.classify(facts.path);

    // A demo role stands in for the resolved identity.
    let (role, granted) = match (facts.demo_role, facts.identity) {
        (Some(role), _) => (Some(role), Reason::DemoMode),
        (None, Some(identity)) => (Some(identity.role), Reason::Authorized),
        (None, None) => (None, Reason::Authorized),
    };

    match (class, role) {
        (PathClass::Protected(_), None) => Decision::new(
            RoutingDecision::Redirect {
                target: rules.login_path().to_string(),
                query: vec![("redirect".to_string(), facts.path.to_uri_path())],
            },
            Reason::SessionAbsentOrInvalid,
        ),
        (PathClass::Protected(tree), Some(role)) if role != tree => Decision::new(
            RoutingDecision::redirect(role.home_path()),
            Reason::RoleMismatch,
        ),
        (PathClass::Protected(_), Some(_)) => Decision::new(RoutingDecision::Continue, granted),
        (PathClass::AuthEntry, Some(role)) => Decision::new(
            RoutingDecision::redirect(role.home_path()),
            Reason::AlreadyAuthenticated,
        ),
        _ if facts.demo_role.is_some() => Decision::new(RoutingDecision::Continue, Reason::DemoMode),
        _ => Decision::new(RoutingDecision::Continue, Reason::Public),
    }
}

fn too_many_requests(outcome: &RateLimitOutcome, retry_after_secs: u64) -> RoutingDecision {
    RoutingDecision::Reject {
        status: StatusCode::TOO_MANY_REQUESTS,
        body: json!({
            "error": "Too Many Requests",
            "message": format!("Too many requests. Please try again in {retry_after_secs} seconds."),
            "retryAfter": retry_after_secs,
        }),
        headers: outcome.headers(),
    }
}
