//! Session resolution: request cookies → verified identity.
//!
//! Every call to the identity service is bounded by the configured timeout.
//! Any failure (network, timeout, unexpected status, malformed body) leaves
//! the identity unresolved, which the access router treats as anonymous.

use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::CookieJar;
use tokio::time::timeout;

use crate::auth::identity::Identity;
use crate::auth::service::{IdentityError, IdentityService};
use crate::observability::metrics;

/// Exchanges the session cookie for an [`Identity`].
#[derive(Clone)]
pub struct SessionResolver {
    service: Arc<dyn IdentityService>,
    cookie_name: String,
    timeout: Duration,
}

impl SessionResolver {
    pub fn new(service: Arc<dyn IdentityService>, cookie_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            service,
            cookie_name: cookie_name.into(),
            timeout,
        }
    }

    /// Resolve the identity behind the request's session cookie.
    pub async fn resolve(&self, jar: &CookieJar) -> Option<Identity> {
        let token = jar
            .get(&self.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())?;

        match self.try_resolve(&token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "Identity resolution failed; treating request as anonymous");
                metrics::record_identity_error(e.kind());
                None
            }
        }
    }

    async fn try_resolve(&self, token: &str) -> Result<Option<Identity>, IdentityError> {
        let Some(user_id) = self.bounded(self.service.verify_session(token)).await? else {
            tracing::debug!("Session cookie did not verify");
            return Ok(None);
        };

        let role = self.bounded(self.service.fetch_role(&user_id, token)).await?;
        match role {
            Some(role) => Ok(Some(Identity { user_id, role })),
            None => {
                tracing::debug!(user_id = %user_id, "Verified user has no stored role");
                Ok(None)
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, IdentityError>
    where
        F: std::future::Future<Output = Result<T, IdentityError>>,
    {
        match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
