//! Environment overrides.
//!
//! Identity credentials and the demo flag are deployment secrets/switches, so
//! they are read from the environment after the file is parsed.

use crate::config::schema::{DeploymentTier, GatekeeperConfig};

pub const IDENTITY_URL_VAR: &str = "IDENTITY_SERVICE_URL";
pub const IDENTITY_KEY_VAR: &str = "IDENTITY_SERVICE_PUBLIC_KEY";
pub const DEMO_MODE_VAR: &str = "DEMO_MODE";
pub const DEPLOYMENT_TIER_VAR: &str = "DEPLOYMENT_TIER";

/// Apply overrides from the process environment.
pub fn apply_process_env(config: &mut GatekeeperConfig) {
    apply_env_overrides(config, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut GatekeeperConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(IDENTITY_URL_VAR) {
        config.identity.url = Some(url);
    }
    if let Some(key) = lookup(IDENTITY_KEY_VAR) {
        config.identity.public_key = Some(key);
    }
    if let Some(flag) = lookup(DEMO_MODE_VAR) {
        config.demo.enabled = parse_flag(&flag);
    }
    if let Some(tier) = lookup(DEPLOYMENT_TIER_VAR) {
        match tier.parse::<DeploymentTier>() {
            Ok(tier) => config.demo.tier = tier,
            Err(e) => {
                // Unknown tiers are treated as production so demo mode stays off.
                tracing::warn!(error = %e, "Treating deployment tier as production");
                config.demo.tier = DeploymentTier::Production;
            }
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
