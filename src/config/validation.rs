//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and path shapes.
//! All errors are collected, not just the first.

use thiserror::Error;

use crate::config::schema::GatekeeperConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("rate_limit.sweep_probability must be within [0, 1]")]
    SweepProbability,

    #[error("{field} entry '{path}' must start with '/'")]
    RelativePath { field: &'static str, path: String },

    #[error("identity.url '{0}' is not an absolute URL")]
    IdentityUrl(String),

    #[error("upstream.address must not be empty")]
    EmptyUpstream,
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::NotPositive { field: "rate_limit.max_requests" });
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "rate_limit.window_ms" });
    }
    if !(0.0..=1.0).contains(&config.rate_limit.sweep_probability) {
        errors.push(ValidationError::SweepProbability);
    }
    if config.identity.timeout_ms == 0 {
        errors.push(ValidationError::NotPositive { field: "identity.timeout_ms" });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::NotPositive { field: "listener.request_timeout_secs" });
    }
    if config.upstream.address.trim().is_empty() {
        errors.push(ValidationError::EmptyUpstream);
    }

    let routing = &config.routing;
    check_paths(&mut errors, "routing.sensitive_paths", &routing.sensitive_paths);
    check_paths(&mut errors, "routing.auth_entry_paths", &routing.auth_entry_paths);
    check_paths(&mut errors, "routing.excluded_prefixes", &routing.excluded_prefixes);
    check_paths(&mut errors, "routing.login_path", std::slice::from_ref(&routing.login_path));
    check_paths(&mut errors, "identity.user_endpoint", std::slice::from_ref(&config.identity.user_endpoint));
    check_paths(&mut errors, "identity.role_endpoint", std::slice::from_ref(&config.identity.role_endpoint));

    if let Some(raw) = config.identity.url.as_deref().filter(|u| !u.trim().is_empty()) {
        if url::Url::parse(raw).map(|u| u.cannot_be_a_base()).unwrap_or(true) {
            errors.push(ValidationError::IdentityUrl(raw.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_paths(errors: &mut Vec<ValidationError>, field: &'static str, paths: &[String]) {
    for path in paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath { field, path: path.clone() });
        }
    }
}
