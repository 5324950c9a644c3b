//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request, routing::get, Router};
use edge_gatekeeper::auth::{IdentityError, IdentityService, Role};
use edge_gatekeeper::security::InMemoryStore;
use edge_gatekeeper::{Gatekeeper, GatekeeperConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Identity service keyed by session token.
#[derive(Default)]
pub struct FakeIdentityService {
    sessions: HashMap<String, (String, Role)>,
    pub calls: AtomicUsize,
}

impl FakeIdentityService {
    pub fn with_session(mut self, token: &str, user_id: &str, role: Role) -> Self {
        self.sessions.insert(token.to_string(), (user_id.to_string(), role));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityService for FakeIdentityService {
    async fn verify_session(&self, access_token: &str) -> Result<Option<String>, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sessions.get(access_token).map(|(id, _)| id.clone()))
    }

    async fn fetch_role(&self, user_id: &str, _access_token: &str) -> Result<Option<Role>, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .sessions
            .values()
            .find(|(id, _)| id == user_id)
            .map(|(_, role)| *role))
    }
}

/// Defaults with identity configured and the random sweep off.
pub fn configured() -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.identity.url = Some("https://identity.test".into());
    config.identity.public_key = Some("anon-key".into());
    config.rate_limit.sweep_probability = 0.0;
    config.rate_limit.sweep_interval_secs = 0;
    config
}

/// Defaults with no identity credentials.
pub fn unconfigured() -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.identity.url = None;
    config.identity.public_key = None;
    config.rate_limit.sweep_probability = 0.0;
    config.rate_limit.sweep_interval_secs = 0;
    config
}

pub fn gatekeeper(config: &GatekeeperConfig, service: Arc<FakeIdentityService>) -> Arc<Gatekeeper> {
    Arc::new(Gatekeeper::with_parts(
        config,
        Arc::new(InMemoryStore::new()),
        Some(service as Arc<dyn IdentityService>),
    ))
}

/// An application whose every page answers 200 with its own path.
pub fn app(gatekeeper: Arc<Gatekeeper>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .fallback(|request: Request<Body>| async move { request.uri().path().to_string() });
    edge_gatekeeper::http::protect(app, gatekeeper)
}

pub fn request(path: &str) -> axum::http::request::Builder {
    Request::builder().uri(path)
}

/// Start a simple mock upstream that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
