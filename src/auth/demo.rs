//! Demo mode: simulate a role from a cookie instead of a real session.
//!
//! Active only when the flag is set AND the tier is not production.

use axum_extra::extract::cookie::CookieJar;

use crate::auth::identity::Role;
use crate::config::{DemoConfig, DeploymentTier};

#[derive(Debug, Clone)]
pub struct DemoModeOverride {
    active: bool,
    cookie_name: String,
}

impl DemoModeOverride {
    pub fn from_config(config: &DemoConfig) -> Self {
        let active = config.enabled && config.tier != DeploymentTier::Production;
        if config.enabled && !active {
            tracing::warn!("Demo mode flag ignored in production");
        }
        Self {
            active,
            cookie_name: config.cookie.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Role named by the demo cookie, if demo mode is active and the value is a role.
    pub fn simulated_role(&self, jar: &CookieJar) -> Option<Role> {
        if !self.active {
            return None;
        }
        jar.get(&self.cookie_name)
            .and_then(|c| c.value().parse::<Role>().ok())
    }
}
