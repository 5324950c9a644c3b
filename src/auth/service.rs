//! Client for the external identity service.
//!
//! # Responsibilities
//! - Verify a session access token and return the user id
//! - Look up the role stored for a user id
//! - Report transport and protocol failures as typed errors
//!
//! Timeouts are applied by the caller (`session.rs`) so that every
//! implementation is bounded the same way.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::identity::Role;
use crate::config::{IdentityConfig, IdentityEndpoint};

/// Errors from identity service calls.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Network failure reaching the service.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded the configured deadline.
    #[error("identity service timed out after {0} ms")]
    Timeout(u64),

    /// Service answered with an unexpected status.
    #[error("identity service rejected the request with status {0}")]
    Rejected(u16),

    /// Body did not have the expected shape.
    #[error("invalid identity service response: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::Unavailable(_) => "unavailable",
            IdentityError::Timeout(_) => "timeout",
            IdentityError::Rejected(_) => "rejected",
            IdentityError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// The identity service seam.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// `Ok(None)` means the token is not a valid session.
    async fn verify_session(&self, access_token: &str) -> Result<Option<String>, IdentityError>;

    /// `Ok(None)` means no role is stored for the user.
    async fn fetch_role(&self, user_id: &str, access_token: &str) -> Result<Option<Role>, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    role: Option<String>,
}

/// HTTP implementation over reqwest.
#[derive(Clone)]
pub struct HttpIdentityService {
    client: reqwest::Client,
    endpoint: IdentityEndpoint,
    user_endpoint: String,
    role_endpoint: String,
}

impl HttpIdentityService {
    pub fn new(endpoint: IdentityEndpoint, config: &IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            user_endpoint: config.user_endpoint.clone(),
            role_endpoint: config.role_endpoint.clone(),
        }
    }

    fn get(&self, path: &str, access_token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.endpoint.url, path))
            .header("apikey", &self.endpoint.public_key)
            .bearer_auth(access_token)
    }
}

fn transport(e: reqwest::Error) -> IdentityError {
    IdentityError::Unavailable(e.to_string())
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn verify_session(&self, access_token: &str) -> Result<Option<String>, IdentityError> {
        let response = self
            .get(&self.user_endpoint, access_token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserResponse = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
                Ok(Some(user.id).filter(|id| !id.is_empty()))
            }
            status => Err(IdentityError::Rejected(status.as_u16())),
        }
    }

    async fn fetch_role(&self, user_id: &str, access_token: &str) -> Result<Option<Role>, IdentityError> {
        let response = self
            .get(&self.role_endpoint, access_token)
            .query(&[("id", format!("eq.{user_id}")), ("select", "role".to_string())])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let rows: Vec<ProfileRow> = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.role)
            .and_then(|raw| match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Ignoring unrecognised stored role");
                    None
                }
            }))
    }
}
